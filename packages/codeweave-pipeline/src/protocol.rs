//! Stage protocol: the stage trait, per-stage metrics, and hooks.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::context::StageContext;
use crate::error::PipelineError;

/// Metrics for one stage run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage_name: String,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub items_processed: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl StageMetrics {
    pub fn new(stage_name: impl Into<String>, duration_ms: f64, items_processed: usize) -> Self {
        Self {
            stage_name: stage_name.into(),
            duration_ms,
            error: None,
            items_processed,
            metadata: BTreeMap::new(),
        }
    }
}

/// A failed stage hands back the context it was given so the pipeline can
/// return whatever was produced before the failure.
pub struct StageFailure {
    pub error: PipelineError,
    pub ctx: StageContext,
}

impl StageFailure {
    pub fn new(ctx: StageContext, error: PipelineError) -> Self {
        Self { error, ctx }
    }
}

pub type StageResult = std::result::Result<StageContext, StageFailure>;

/// A pipeline stage.
///
/// `should_skip` must be pure and fast (no I/O); `run` consumes the context
/// and returns an updated one. A returned failure aborts the pipeline and
/// carries the context back for partial results; per-file faults belong in
/// `ctx.errors` instead.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn should_skip(&self, _ctx: &StageContext) -> (bool, Option<String>) {
        (false, None)
    }

    async fn run(&self, ctx: StageContext) -> StageResult;
}

type StartHook = Box<dyn Fn(&str, &StageContext) + Send + Sync>;
type CompleteHook = Box<dyn Fn(&str, &StageContext, f64) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&str, &StageContext, &PipelineError) + Send + Sync>;

/// Observability hooks. Hook panics are caught and logged; they never
/// affect pipeline execution.
#[derive(Default)]
pub struct PipelineHooks {
    on_stage_start: Vec<StartHook>,
    on_stage_complete: Vec<CompleteHook>,
    on_stage_error: Vec<ErrorHook>,
}

impl PipelineHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(&mut self, hook: impl Fn(&str, &StageContext) + Send + Sync + 'static) {
        self.on_stage_start.push(Box::new(hook));
    }

    pub fn on_complete(&mut self, hook: impl Fn(&str, &StageContext, f64) + Send + Sync + 'static) {
        self.on_stage_complete.push(Box::new(hook));
    }

    pub fn on_error(
        &mut self,
        hook: impl Fn(&str, &StageContext, &PipelineError) + Send + Sync + 'static,
    ) {
        self.on_stage_error.push(Box::new(hook));
    }

    pub fn fire_start(&self, stage: &str, ctx: &StageContext) {
        for hook in &self.on_stage_start {
            if catch_unwind(AssertUnwindSafe(|| hook(stage, ctx))).is_err() {
                warn!(stage, "on_stage_start hook panicked");
            }
        }
    }

    pub fn fire_complete(&self, stage: &str, ctx: &StageContext, duration_ms: f64) {
        for hook in &self.on_stage_complete {
            if catch_unwind(AssertUnwindSafe(|| hook(stage, ctx, duration_ms))).is_err() {
                warn!(stage, "on_stage_complete hook panicked");
            }
        }
    }

    pub fn fire_error(&self, stage: &str, ctx: &StageContext, error: &PipelineError) {
        for hook in &self.on_stage_error {
            if catch_unwind(AssertUnwindSafe(|| hook(stage, ctx, error))).is_err() {
                warn!(stage, "on_stage_error hook panicked");
            }
        }
    }
}
