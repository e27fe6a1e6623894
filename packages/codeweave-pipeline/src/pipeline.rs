//! Pipeline entry point and fluent builder.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use codeweave_ir::{GlobalContext, IRDocument, ProvenanceData, SemanticIr};
use tokio_util::sync::CancellationToken;

use crate::config::{BuildConfig, Profile};
use crate::context::{CacheState, StageContext};
use crate::error::PipelineError;
use crate::orchestrator::StageOrchestrator;
use crate::protocol::{PipelineHooks, PipelineStage, StageMetrics};
use crate::stages::{CacheStage, CrossFileStage, ProvenanceStage, SemanticStage, StructuralStage};

/// What a pipeline run returns. On a stage error, `ir_documents` holds
/// whatever was produced before the failure.
#[derive(Default)]
pub struct PipelineResult {
    pub ir_documents: HashMap<String, IRDocument>,
    pub semantic: HashMap<String, SemanticIr>,
    pub global_ctx: Option<GlobalContext>,
    pub provenance: HashMap<String, ProvenanceData>,
    pub cache_state: Option<CacheState>,
    pub stage_metrics: Vec<StageMetrics>,
    pub total_duration_ms: u64,
    /// Stage failures and per-file faults, stage-name prefixed.
    pub errors: Vec<String>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The IR construction pipeline.
pub struct IrPipeline {
    config: Arc<BuildConfig>,
    stages: Vec<Arc<dyn PipelineStage>>,
    hooks: Arc<PipelineHooks>,
    parallel_groups: Option<Vec<Vec<usize>>>,
    cancellation: CancellationToken,
    cached_irs: HashMap<String, IRDocument>,
    prior_global_ctx: Option<GlobalContext>,
}

impl IrPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Execute the pipeline over a file set.
    pub async fn execute(&self, files: Vec<PathBuf>) -> PipelineResult {
        let start = Instant::now();

        let mut ctx = StageContext::new(files, Arc::clone(&self.config));
        ctx.cached_irs = self.cached_irs.clone();
        ctx.global_ctx = self.prior_global_ctx.clone();

        let orchestrator = StageOrchestrator::new(
            self.stages.clone(),
            Arc::clone(&self.hooks),
            self.cancellation.clone(),
        );

        let outcome = match &self.parallel_groups {
            Some(groups) => orchestrator.execute_parallel(ctx, groups).await,
            None => orchestrator.execute(ctx).await,
        };

        let mut errors = outcome.ctx.errors.clone();
        if let Some(error) = outcome.error {
            match error {
                PipelineError::Cancelled => errors.push("cancelled".to_string()),
                other => errors.push(other.to_string()),
            }
        }

        PipelineResult {
            ir_documents: outcome.ctx.ir_documents,
            semantic: outcome.ctx.semantic,
            global_ctx: outcome.ctx.global_ctx,
            provenance: outcome.ctx.provenance,
            cache_state: outcome.ctx.cache_state,
            stage_metrics: outcome.ctx.stage_metrics,
            total_duration_ms: start.elapsed().as_millis() as u64,
            errors,
        }
    }

    /// Token that cancels the pipeline at the next stage boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

/// Fluent builder with preset profiles.
pub struct PipelineBuilder {
    config: BuildConfig,
    hooks: PipelineHooks,
    parallel_groups: Option<Vec<Vec<usize>>>,
    cancellation: Option<CancellationToken>,
    cached_irs: HashMap<String, IRDocument>,
    prior_global_ctx: Option<GlobalContext>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: BuildConfig::default(),
            hooks: PipelineHooks::new(),
            parallel_groups: None,
            cancellation: None,
            cached_irs: HashMap::new(),
            prior_global_ctx: None,
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.config = self.config.with_profile(profile);
        self
    }

    /// Supply prior-run documents as the cache.
    pub fn with_cached_irs(mut self, cached_irs: HashMap<String, IRDocument>) -> Self {
        self.cached_irs = cached_irs;
        self
    }

    /// Supply the prior global context for incremental cross-file updates.
    pub fn with_prior_global_ctx(mut self, global_ctx: GlobalContext) -> Self {
        self.prior_global_ctx = Some(global_ctx);
        self
    }

    pub fn on_stage_start(
        mut self,
        hook: impl Fn(&str, &StageContext) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.on_start(hook);
        self
    }

    pub fn on_stage_complete(
        mut self,
        hook: impl Fn(&str, &StageContext, f64) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.on_complete(hook);
        self
    }

    pub fn on_stage_error(
        mut self,
        hook: impl Fn(&str, &StageContext, &PipelineError) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.on_error(hook);
        self
    }

    /// Run stage index groups concurrently (groups execute in order).
    pub fn with_parallel_groups(mut self, groups: Vec<Vec<usize>>) -> Self {
        self.parallel_groups = Some(groups);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn build(self) -> IrPipeline {
        let stages = stages_for_profile(&self.config);

        IrPipeline {
            config: Arc::new(self.config),
            stages,
            hooks: Arc::new(self.hooks),
            parallel_groups: self.parallel_groups,
            cancellation: self.cancellation.unwrap_or_default(),
            cached_irs: self.cached_irs,
            prior_global_ctx: self.prior_global_ctx,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage list per profile:
/// - fast: cache (fast path only) + structural + cross-file
/// - balanced: cache + structural + cross-file + provenance
/// - full: cache + structural + semantic + cross-file + provenance
fn stages_for_profile(config: &BuildConfig) -> Vec<Arc<dyn PipelineStage>> {
    let cache: Arc<dyn PipelineStage> =
        Arc::new(CacheStage::new(config.cache_enabled, config.fast_path_only));
    let structural: Arc<dyn PipelineStage> = Arc::new(StructuralStage::new(true));
    let cross_file: Arc<dyn PipelineStage> =
        Arc::new(CrossFileStage::new(true, config.incremental));
    let provenance: Arc<dyn PipelineStage> = Arc::new(ProvenanceStage::new(true));

    match config.profile {
        Profile::Fast => vec![cache, structural, cross_file],
        Profile::Balanced => vec![cache, structural, cross_file, provenance],
        Profile::Full => vec![
            cache,
            structural,
            Arc::new(SemanticStage::new(true)),
            cross_file,
            provenance,
        ],
    }
}
