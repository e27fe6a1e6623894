//! Pipeline configuration.

use std::path::PathBuf;

use codeweave_ir::{FingerprintConfig, HashAlgorithm};
use serde::{Deserialize, Serialize};

/// Preset stage selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Cache (fast path only) + structural + cross-file. No semantic
    /// enrichment, no provenance.
    Fast,
    /// Cache + structural + cross-file + provenance.
    Balanced,
    /// All stages.
    Full,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Balanced
    }
}

/// Configuration for a pipeline build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub profile: Profile,
    /// Root directory used to compute module paths.
    pub repo_root: Option<PathBuf>,
    pub repo_id: String,
    pub snapshot_id: String,
    /// Bound on the CPU pool for per-file work.
    pub parallel_workers: usize,
    pub cache_enabled: bool,
    /// Skip slow-path hash validation.
    pub fast_path_only: bool,
    /// Enable incremental cross-file update when prior state is available.
    pub incremental: bool,
    /// Per-file walker timeout in seconds.
    pub walker_timeout_secs: u64,
    /// Files larger than this are skipped with a warning.
    pub max_file_size: u64,
    pub hash_algorithm: HashAlgorithm,
    pub include_comments: bool,
    pub include_docstrings: bool,
    pub normalize_whitespace: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Balanced,
            repo_root: None,
            repo_id: "repo".to_string(),
            snapshot_id: "snapshot".to_string(),
            parallel_workers: default_workers(),
            cache_enabled: true,
            fast_path_only: false,
            incremental: true,
            walker_timeout_secs: 30,
            max_file_size: 10 * 1024 * 1024,
            hash_algorithm: HashAlgorithm::Sha256,
            include_comments: false,
            include_docstrings: true,
            normalize_whitespace: true,
        }
    }
}

impl BuildConfig {
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        if profile == Profile::Fast {
            self.fast_path_only = true;
        }
        self
    }

    pub fn fingerprint_config(&self) -> FingerprintConfig {
        FingerprintConfig {
            hash_algorithm: self.hash_algorithm,
            include_comments: self.include_comments,
            include_docstrings: self.include_docstrings,
            normalize_whitespace: self.normalize_whitespace,
        }
    }
}

/// 75% of available cores, at least one.
fn default_workers() -> usize {
    (num_cpus::get() * 3 / 4).max(1)
}
