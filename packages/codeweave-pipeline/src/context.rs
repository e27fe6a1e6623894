//! Stage context — the value threaded through the pipeline.
//!
//! Each stage consumes a context and returns a new one. There is no shared
//! mutable state: parallel groups clone the pre-group context and their
//! results are merged explicitly.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use codeweave_ir::{GlobalContext, IRDocument, ProvenanceData, SemanticIr};
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::protocol::StageMetrics;

/// Cache hit/miss statistics emitted by the cache stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
    pub total_files: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub fast_path_hits: usize,
    pub slow_path_hits: usize,
}

/// Shared context passed between pipeline stages.
#[derive(Clone, Default)]
pub struct StageContext {
    pub files: Vec<PathBuf>,
    pub config: Arc<BuildConfig>,
    /// file path → IR document (cache hits + freshly built).
    pub ir_documents: HashMap<String, IRDocument>,
    /// Per-document semantic derivations.
    pub semantic: HashMap<String, SemanticIr>,
    pub global_ctx: Option<GlobalContext>,
    pub provenance: HashMap<String, ProvenanceData>,
    pub stage_metrics: Vec<StageMetrics>,
    /// Files the cache stage marked as misses (None before the cache ran,
    /// or when nothing missed).
    pub changed_files: Option<HashSet<PathBuf>>,
    /// Cache supplied by the caller: file path → prior document.
    pub cached_irs: HashMap<String, IRDocument>,
    pub cache_state: Option<CacheState>,
    /// Per-file fault messages; these never abort the pipeline.
    pub errors: Vec<String>,
}

impl StageContext {
    pub fn new(files: Vec<PathBuf>, config: Arc<BuildConfig>) -> Self {
        Self {
            files,
            config,
            ..Default::default()
        }
    }

    /// Files the structural stage still has to process: the cache's miss
    /// set if it ran, otherwise everything without a document.
    pub fn files_to_process(&self) -> Vec<PathBuf> {
        if let Some(changed) = &self.changed_files {
            let mut list: Vec<PathBuf> = changed.iter().cloned().collect();
            list.sort();
            return list;
        }

        self.files
            .iter()
            .filter(|f| !self.ir_documents.contains_key(&path_key(f)))
            .cloned()
            .collect()
    }
}

/// Canonical string key for a file path.
pub fn path_key(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}
