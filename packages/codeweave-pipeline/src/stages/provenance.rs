//! Provenance stage: deterministic file and function fingerprints.
//!
//! Hashing fans out with rayon on the blocking pool; a file that cannot be
//! read is recorded as a per-file fault and skipped.

use async_trait::async_trait;
use codeweave_ir::{FingerprintBuilder, ProvenanceData};
use rayon::prelude::*;
use tracing::info;

use crate::context::StageContext;
use crate::protocol::{PipelineStage, StageResult};

pub struct ProvenanceStage {
    enabled: bool,
}

impl ProvenanceStage {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl PipelineStage for ProvenanceStage {
    fn name(&self) -> &'static str {
        "ProvenanceStage"
    }

    fn should_skip(&self, ctx: &StageContext) -> (bool, Option<String>) {
        if !self.enabled {
            return (true, Some("Provenance tracking disabled".to_string()));
        }
        if ctx.ir_documents.is_empty() {
            return (true, Some("No IR documents to fingerprint".to_string()));
        }
        (false, None)
    }

    async fn run(&self, mut ctx: StageContext) -> StageResult {
        let fingerprint_config = ctx.config.fingerprint_config();
        let docs: Vec<codeweave_ir::IRDocument> = ctx.ir_documents.values().cloned().collect();

        let results: Vec<Result<ProvenanceData, String>> =
            tokio::task::spawn_blocking(move || {
                let builder = FingerprintBuilder::new(fingerprint_config);
                docs.par_iter()
                    .map(|doc| {
                        builder
                            .compute(doc)
                            .map_err(|e| format!("{}: {}", doc.file_path, e))
                    })
                    .collect()
            })
            .await
            .unwrap_or_default();

        let mut computed = 0usize;
        for result in results {
            match result {
                Ok(data) => {
                    ctx.provenance.insert(data.file_path.clone(), data);
                    computed += 1;
                }
                Err(message) => ctx.errors.push(message),
            }
        }

        info!(
            files = computed,
            algorithm = ctx.config.hash_algorithm.as_str(),
            "provenance computed"
        );
        Ok(ctx)
    }
}
