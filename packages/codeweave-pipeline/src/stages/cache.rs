//! Cache stage: fast/slow path validation of cached IR documents.
//!
//! Fast path is one stat per file (mtime + size against the document's
//! cache stamp). Slow path hashes the current content and compares it to
//! the hash the document was built from; a slow-path hit refreshes the
//! stamp so the next run takes the fast path. Stat or read errors demote
//! the file to a miss.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use codeweave_ir::shared::id_strategy::content_hash;
use codeweave_ir::{CacheStamp, IRDocument};
use tracing::{debug, info, warn};

use crate::context::{path_key, CacheState, StageContext};
use crate::protocol::{PipelineStage, StageResult};

pub struct CacheStage {
    enabled: bool,
    fast_path_only: bool,
}

impl CacheStage {
    pub fn new(enabled: bool, fast_path_only: bool) -> Self {
        Self {
            enabled,
            fast_path_only,
        }
    }

    fn validate_file(
        &self,
        file: &Path,
        cached: &IRDocument,
    ) -> Validation {
        if !file.exists() {
            debug!(file = %file.display(), "fast path miss (file deleted)");
            return Validation::Miss;
        }

        let stat = match std::fs::metadata(file) {
            Ok(stat) => stat,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "stat failed, demoting to miss");
                return Validation::Miss;
            }
        };
        let mtime_ns = stat
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let size = stat.len();

        // Fast path: mtime + size
        if let Some(stamp) = cached.cache {
            if stamp.mtime_ns == mtime_ns && stamp.size == size {
                debug!(file = %file.display(), "fast path hit");
                return Validation::FastHit;
            }
        }

        if self.fast_path_only {
            debug!(file = %file.display(), "fast path miss (slow path disabled)");
            return Validation::Miss;
        }

        // Slow path: content hash
        let current = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "read failed, demoting to miss");
                return Validation::Miss;
            }
        };

        match &cached.content_hash {
            Some(cached_hash) if *cached_hash == content_hash(&current) => {
                debug!(file = %file.display(), "slow path hit");
                Validation::SlowHit(CacheStamp { mtime_ns, size })
            }
            _ => {
                debug!(file = %file.display(), "slow path miss");
                Validation::Miss
            }
        }
    }
}

enum Validation {
    FastHit,
    /// Hit with a fresh stamp to store for next time.
    SlowHit(CacheStamp),
    Miss,
}

#[async_trait]
impl PipelineStage for CacheStage {
    fn name(&self) -> &'static str {
        "CacheStage"
    }

    fn should_skip(&self, ctx: &StageContext) -> (bool, Option<String>) {
        if !self.enabled {
            return (true, Some("Cache disabled".to_string()));
        }
        if ctx.cached_irs.is_empty() {
            return (true, Some("No cached IRs provided".to_string()));
        }
        (false, None)
    }

    async fn run(&self, mut ctx: StageContext) -> StageResult {
        let mut cache_hits: HashMap<String, IRDocument> = HashMap::new();
        let mut cache_misses: HashSet<PathBuf> = HashSet::new();
        let mut fast_path_hits = 0usize;
        let mut slow_path_hits = 0usize;

        for file in &ctx.files {
            let key = path_key(file);
            let Some(cached) = ctx.cached_irs.get(&key) else {
                cache_misses.insert(file.clone());
                continue;
            };

            match self.validate_file(file, cached) {
                Validation::FastHit => {
                    cache_hits.insert(key, cached.clone());
                    fast_path_hits += 1;
                }
                Validation::SlowHit(stamp) => {
                    let mut doc = cached.clone();
                    doc.cache = Some(stamp);
                    cache_hits.insert(key, doc);
                    slow_path_hits += 1;
                }
                Validation::Miss => {
                    cache_misses.insert(file.clone());
                }
            }
        }

        let cache_state = CacheState {
            total_files: ctx.files.len(),
            cache_hits: cache_hits.len(),
            cache_misses: cache_misses.len(),
            fast_path_hits,
            slow_path_hits,
        };
        info!(
            hits = cache_state.cache_hits,
            misses = cache_state.cache_misses,
            fast = fast_path_hits,
            slow = slow_path_hits,
            "cache validated"
        );

        ctx.ir_documents.extend(cache_hits);
        ctx.changed_files = Some(cache_misses);
        ctx.cache_state = Some(cache_state);
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use codeweave_ir::{generate, Language, SourceFile};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn stamped_doc(path: &Path, content: &str) -> IRDocument {
        let source = SourceFile::new(
            path.to_string_lossy().into_owned(),
            content,
            "m",
            Language::Python,
        );
        let mut doc = generate("repo", &source, "snap").unwrap();
        let stat = std::fs::metadata(path).unwrap();
        doc.cache = Some(CacheStamp {
            mtime_ns: stat
                .modified()
                .unwrap()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos(),
            size: stat.len(),
        });
        doc
    }

    fn context_with(files: Vec<PathBuf>, cached: HashMap<String, IRDocument>) -> StageContext {
        let mut ctx = StageContext::new(files, Arc::new(BuildConfig::default()));
        ctx.cached_irs = cached;
        ctx
    }

    #[tokio::test]
    async fn test_fast_path_hit() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "x.py", "def f(): pass\n");
        let doc = stamped_doc(&path, "def f(): pass\n");

        let mut cached = HashMap::new();
        cached.insert(path_key(&path), doc);
        let ctx = context_with(vec![path.clone()], cached);

        let stage = CacheStage::new(true, false);
        let result = stage.run(ctx).await.map_err(|f| f.error.to_string()).unwrap();

        let state = result.cache_state.unwrap();
        assert_eq!(state.fast_path_hits, 1);
        assert_eq!(state.slow_path_hits, 0);
        assert_eq!(state.cache_misses, 0);
        assert!(result.ir_documents.contains_key(&path_key(&path)));
        assert!(result.changed_files.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_path_hit_after_touch() {
        let dir = TempDir::new().unwrap();
        let content = "def f(): pass\n";
        let path = write_file(&dir, "x.py", content);
        let mut doc = stamped_doc(&path, content);
        // Simulate a prior run: mtime differs, content identical
        doc.cache = Some(CacheStamp {
            mtime_ns: 1,
            size: doc.cache.unwrap().size,
        });

        let mut cached = HashMap::new();
        cached.insert(path_key(&path), doc);
        let ctx = context_with(vec![path.clone()], cached);

        let stage = CacheStage::new(true, false);
        let result = stage.run(ctx).await.map_err(|f| f.error.to_string()).unwrap();

        let state = result.cache_state.unwrap();
        assert_eq!(state.fast_path_hits, 0);
        assert_eq!(state.slow_path_hits, 1);
        assert_eq!(state.cache_misses, 0);

        // Stamp refreshed for next time
        let refreshed = result.ir_documents.get(&path_key(&path)).unwrap();
        assert_ne!(refreshed.cache.unwrap().mtime_ns, 1);
    }

    #[tokio::test]
    async fn test_changed_content_misses() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "x.py", "def f(): return 2\n");
        let mut doc = stamped_doc(&path, "def f(): pass\n");
        // Stale stamp and stale hash
        doc.cache = Some(CacheStamp { mtime_ns: 1, size: 1 });
        doc.content_hash = Some(content_hash("def f(): pass\n"));

        let mut cached = HashMap::new();
        cached.insert(path_key(&path), doc);
        let ctx = context_with(vec![path.clone()], cached);

        let stage = CacheStage::new(true, false);
        let result = stage.run(ctx).await.map_err(|f| f.error.to_string()).unwrap();

        let state = result.cache_state.unwrap();
        assert_eq!(state.cache_misses, 1);
        assert!(result.changed_files.unwrap().contains(&path));
    }

    #[tokio::test]
    async fn test_fast_path_only_skips_hashing() {
        let dir = TempDir::new().unwrap();
        let content = "def f(): pass\n";
        let path = write_file(&dir, "x.py", content);
        let mut doc = stamped_doc(&path, content);
        doc.cache = Some(CacheStamp {
            mtime_ns: 1,
            size: doc.cache.unwrap().size,
        });

        let mut cached = HashMap::new();
        cached.insert(path_key(&path), doc);
        let ctx = context_with(vec![path.clone()], cached);

        // Content is identical but the slow path is disabled → miss
        let stage = CacheStage::new(true, true);
        let result = stage.run(ctx).await.map_err(|f| f.error.to_string()).unwrap();
        assert_eq!(result.cache_state.unwrap().cache_misses, 1);
    }

    #[tokio::test]
    async fn test_missing_file_misses() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "x.py", "def f(): pass\n");
        let doc = stamped_doc(&path, "def f(): pass\n");
        std::fs::remove_file(&path).unwrap();

        let mut cached = HashMap::new();
        cached.insert(path_key(&path), doc);
        let ctx = context_with(vec![path.clone()], cached);

        let stage = CacheStage::new(true, false);
        let result = stage.run(ctx).await.map_err(|f| f.error.to_string()).unwrap();
        assert_eq!(result.cache_state.unwrap().cache_misses, 1);
    }

    #[test]
    fn test_skip_conditions() {
        let stage = CacheStage::new(false, false);
        let ctx = StageContext::default();
        let (skip, reason) = stage.should_skip(&ctx);
        assert!(skip);
        assert_eq!(reason.as_deref(), Some("Cache disabled"));

        let stage = CacheStage::new(true, false);
        let (skip, reason) = stage.should_skip(&ctx);
        assert!(skip);
        assert_eq!(reason.as_deref(), Some("No cached IRs provided"));
    }
}
