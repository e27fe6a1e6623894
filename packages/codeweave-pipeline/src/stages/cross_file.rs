//! Cross-file resolution stage.
//!
//! Full build over all documents, or an incremental update when a prior
//! global context and a changed-file set are available.

use std::collections::HashSet;

use async_trait::async_trait;
use codeweave_ir::{build_global_context, update_global_context};
use tracing::info;

use crate::context::{path_key, StageContext};
use crate::protocol::{PipelineStage, StageResult};

pub struct CrossFileStage {
    enabled: bool,
    incremental: bool,
}

impl CrossFileStage {
    pub fn new(enabled: bool, incremental: bool) -> Self {
        Self {
            enabled,
            incremental,
        }
    }
}

#[async_trait]
impl PipelineStage for CrossFileStage {
    fn name(&self) -> &'static str {
        "CrossFileStage"
    }

    fn should_skip(&self, ctx: &StageContext) -> (bool, Option<String>) {
        if !self.enabled {
            return (true, Some("Cross-file resolution disabled".to_string()));
        }
        if ctx.ir_documents.is_empty() {
            return (true, Some("No IR documents to resolve".to_string()));
        }
        (false, None)
    }

    async fn run(&self, mut ctx: StageContext) -> StageResult {
        // Pull documents out in path order so resolution is deterministic,
        // resolve, then put them back
        let mut paths: Vec<String> = ctx.ir_documents.keys().cloned().collect();
        paths.sort();
        let mut docs: Vec<_> = paths
            .iter()
            .filter_map(|p| ctx.ir_documents.remove(p))
            .collect();

        let has_changes = ctx.changed_files.as_ref().map_or(false, |c| !c.is_empty());
        let prior = if self.incremental && has_changes {
            ctx.global_ctx.take()
        } else {
            None
        };

        let global_ctx = match prior {
            Some(existing) => {
                let changed: HashSet<String> = ctx
                    .changed_files
                    .as_ref()
                    .map(|files| files.iter().map(path_key).collect())
                    .unwrap_or_default();

                let (updated, affected) = update_global_context(&existing, &mut docs, &changed);
                info!(
                    changed = changed.len(),
                    affected = affected.len(),
                    "incremental cross-file update"
                );
                updated
            }
            None => {
                let built = build_global_context(&mut docs);
                info!(
                    symbols = built.statistics.total_symbols,
                    files = built.statistics.total_files,
                    "full cross-file build"
                );
                built
            }
        };

        for doc in docs {
            ctx.ir_documents.insert(doc.file_path.clone(), doc);
        }
        ctx.global_ctx = Some(global_ctx);
        Ok(ctx)
    }
}
