//! Structural IR stage: drive the language walkers across the miss set.
//!
//! File selection is the cache's miss set when the cache ran, otherwise
//! every file without a document. Files are grouped by language, walked on
//! the blocking pool with bounded concurrency and a per-file timeout, and
//! merged into the context without overwriting cache hits. Per-file faults
//! are recorded and never abort the pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use codeweave_ir::{generate, CacheStamp, IRDocument, Language, SourceFile};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::context::{path_key, StageContext};
use crate::protocol::{PipelineStage, StageResult};

pub struct StructuralStage {
    enabled: bool,
}

impl StructuralStage {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

enum FileOutcome {
    Built(String, IRDocument),
    Skipped,
    Fault(String),
}

#[async_trait]
impl PipelineStage for StructuralStage {
    fn name(&self) -> &'static str {
        "StructuralStage"
    }

    fn should_skip(&self, ctx: &StageContext) -> (bool, Option<String>) {
        if !self.enabled {
            return (true, Some("Structural IR disabled".to_string()));
        }
        if ctx.files_to_process().is_empty() {
            return (true, Some("All files cached".to_string()));
        }
        (false, None)
    }

    async fn run(&self, mut ctx: StageContext) -> StageResult {
        let files = ctx.files_to_process();
        info!(count = files.len(), "building structural IR");

        // Group by language so unknown extensions are reported once per
        // file, and batches stay per-grammar
        let mut by_language: HashMap<Language, Vec<PathBuf>> = HashMap::new();
        let mut faults: Vec<String> = Vec::new();
        for file in files {
            match Language::from_path(&file) {
                Some(language) => by_language.entry(language).or_default().push(file),
                None => {
                    debug!(file = %file.display(), "unsupported language, skipping");
                }
            }
        }

        let config = ctx.config.clone();
        let timeout = Duration::from_secs(config.walker_timeout_secs);

        let mut jobs: Vec<(PathBuf, Language)> = by_language
            .into_iter()
            .flat_map(|(language, paths)| {
                paths.into_iter().map(move |p| (p, language))
            })
            .collect();
        jobs.sort_by(|a, b| a.0.cmp(&b.0));

        let outcomes: Vec<FileOutcome> = stream::iter(jobs)
            .map(|(path, language)| {
                let config = config.clone();
                async move {
                    let key = path_key(&path);
                    let handle = tokio::task::spawn_blocking(move || {
                        walk_file(&path, language, &config)
                    });

                    match tokio::time::timeout(timeout, handle).await {
                        Ok(Ok(outcome)) => outcome,
                        Ok(Err(join_err)) => {
                            FileOutcome::Fault(format!("{}: walker panicked: {}", key, join_err))
                        }
                        Err(_) => FileOutcome::Fault(format!(
                            "{}: walker timed out after {}s",
                            key,
                            timeout.as_secs()
                        )),
                    }
                }
            })
            .buffer_unordered(config.parallel_workers.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                FileOutcome::Built(key, doc) => {
                    // Never overwrite cache hits
                    ctx.ir_documents.entry(key).or_insert(doc);
                }
                FileOutcome::Skipped => {}
                FileOutcome::Fault(message) => {
                    warn!(%message, "per-file walker fault");
                    faults.push(message);
                }
            }
        }

        ctx.errors.extend(faults);
        Ok(ctx)
    }
}

/// Read, parse, and walk one file. Runs on the blocking pool.
fn walk_file(path: &Path, language: Language, config: &crate::config::BuildConfig) -> FileOutcome {
    let key = path.to_string_lossy().into_owned();

    let stat = match std::fs::metadata(path) {
        Ok(stat) => stat,
        Err(e) => return FileOutcome::Fault(format!("{}: stat failed: {}", key, e)),
    };
    if stat.len() > config.max_file_size {
        warn!(file = %key, size = stat.len(), "file too large, skipping");
        return FileOutcome::Skipped;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return FileOutcome::Fault(format!("{}: read failed: {}", key, e)),
    };

    let module_path = SourceFile::module_path_for(path, config.repo_root.as_deref());
    let source = SourceFile::new(key.clone(), content, module_path, language);

    match generate(&config.repo_id, &source, &config.snapshot_id) {
        Ok(mut doc) => {
            // Stamp so this run's output can serve as next run's cache
            doc.cache = Some(CacheStamp {
                mtime_ns: stat
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_nanos())
                    .unwrap_or(0),
                size: stat.len(),
            });
            FileOutcome::Built(key, doc)
        }
        Err(e) => FileOutcome::Fault(format!("{}: {}", key, e)),
    }
}
