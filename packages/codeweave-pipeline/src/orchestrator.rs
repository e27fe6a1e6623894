//! Stage orchestrator.
//!
//! Sequential execution with skip logic, hooks, per-stage metrics, and
//! cancellation at stage boundaries; parallel groups run stages
//! concurrently over the same pre-group context and merge their results.
//!
//! Contexts move between stages by ownership; only parallel groups clone,
//! since every stage in a group must see the same pre-group context.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::context::StageContext;
use crate::error::PipelineError;
use crate::protocol::{PipelineHooks, PipelineStage, StageMetrics};


/// Result of driving the stages: the final (or partial) context plus the
/// aborting error, if any.
pub struct ExecutionOutcome {
    pub ctx: StageContext,
    pub error: Option<PipelineError>,
}

enum SingleResult {
    /// Stage ran; updated context.
    Ran(StageContext),
    /// Stage was skipped; context unchanged.
    Skipped(StageContext),
    /// Stage failed; input context returned for partial results.
    Failed(PipelineError, StageContext),
}

pub struct StageOrchestrator {
    stages: Vec<Arc<dyn PipelineStage>>,
    hooks: Arc<PipelineHooks>,
    cancellation: CancellationToken,
}

impl StageOrchestrator {
    pub fn new(
        stages: Vec<Arc<dyn PipelineStage>>,
        hooks: Arc<PipelineHooks>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            stages,
            hooks,
            cancellation,
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Execute all stages in declared order. A stage error aborts the
    /// pipeline; the partial context is still returned.
    pub async fn execute(&self, ctx: StageContext) -> ExecutionOutcome {
        let mut current = ctx;

        for stage in &self.stages {
            if self.cancellation.is_cancelled() {
                return ExecutionOutcome {
                    ctx: current,
                    error: Some(PipelineError::Cancelled),
                };
            }

            match self.execute_single(Arc::clone(stage), current).await {
                SingleResult::Ran(next) | SingleResult::Skipped(next) => current = next,
                SingleResult::Failed(err, partial) => {
                    return ExecutionOutcome {
                        ctx: partial,
                        error: Some(err),
                    };
                }
            }
        }

        ExecutionOutcome {
            ctx: current,
            error: None,
        }
    }

    /// Execute stages in parallel groups. Groups run sequentially; stages
    /// within a group run concurrently over the same pre-group context and
    /// their results are merged.
    pub async fn execute_parallel(
        &self,
        ctx: StageContext,
        parallel_groups: &[Vec<usize>],
    ) -> ExecutionOutcome {
        let mut current = ctx;

        for group in parallel_groups {
            if self.cancellation.is_cancelled() {
                return ExecutionOutcome {
                    ctx: current,
                    error: Some(PipelineError::Cancelled),
                };
            }

            let stages: Vec<Arc<dyn PipelineStage>> = group
                .iter()
                .filter_map(|&i| self.stages.get(i).cloned())
                .collect();

            if stages.len() == 1 {
                match self.execute_single(Arc::clone(&stages[0]), current).await {
                    SingleResult::Ran(next) | SingleResult::Skipped(next) => current = next,
                    SingleResult::Failed(err, partial) => {
                        return ExecutionOutcome {
                            ctx: partial,
                            error: Some(err),
                        };
                    }
                }
                continue;
            }

            let tasks = stages
                .iter()
                .map(|stage| self.execute_single(Arc::clone(stage), current.clone()));
            let results = join_all(tasks).await;

            let mut group_outputs = Vec::new();
            for result in results {
                match result {
                    SingleResult::Ran(output) => group_outputs.push(output),
                    SingleResult::Skipped(_) => {}
                    SingleResult::Failed(err, _) => {
                        return ExecutionOutcome {
                            ctx: current,
                            error: Some(err),
                        };
                    }
                }
            }

            current = merge_contexts(current, group_outputs);
        }

        ExecutionOutcome {
            ctx: current,
            error: None,
        }
    }

    /// Run one stage: skip check, hooks, timing, metric append.
    async fn execute_single(
        &self,
        stage: Arc<dyn PipelineStage>,
        ctx: StageContext,
    ) -> SingleResult {
        let stage_name = stage.name();

        let (skip, reason) = stage.should_skip(&ctx);
        if skip {
            debug!(stage = stage_name, reason = reason.as_deref(), "skipping stage");
            return SingleResult::Skipped(ctx);
        }

        self.hooks.fire_start(stage_name, &ctx);

        let items_before = ctx.ir_documents.len();
        let start = Instant::now();

        let mut result_ctx = match stage.run(ctx).await {
            Ok(result) => result,
            Err(failure) => {
                error!(stage = stage_name, error = %failure.error, "stage failed");
                self.hooks.fire_error(stage_name, &failure.ctx, &failure.error);
                return SingleResult::Failed(
                    wrap_stage_error(stage_name, failure.error),
                    failure.ctx,
                );
            }
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let items_processed = result_ctx.ir_documents.len().saturating_sub(items_before);

        result_ctx
            .stage_metrics
            .push(StageMetrics::new(stage_name, duration_ms, items_processed));

        self.hooks.fire_complete(stage_name, &result_ctx, duration_ms);

        SingleResult::Ran(result_ctx)
    }
}

fn wrap_stage_error(stage: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::Stage { .. } | PipelineError::Cancelled | PipelineError::Timeout { .. } => {
            err
        }
        other => PipelineError::stage(stage, other.to_string()),
    }
}

/// Union merge for parallel group outputs:
/// - `ir_documents`, `semantic`, `provenance`: union, later writer wins
/// - `stage_metrics`: base metrics plus each output's new metrics
/// - `global_ctx`, `cache_state`, `changed_files`: first non-null
/// - `errors`: concatenated
fn merge_contexts(base: StageContext, outputs: Vec<StageContext>) -> StageContext {
    let base_metric_count = base.stage_metrics.len();
    let base_error_count = base.errors.len();
    let mut merged = base;

    for output in outputs {
        merged.ir_documents.extend(output.ir_documents);
        merged.semantic.extend(output.semantic);
        merged.provenance.extend(output.provenance);

        for metric in output.stage_metrics.into_iter().skip(base_metric_count) {
            merged.stage_metrics.push(metric);
        }

        if merged.global_ctx.is_none() {
            merged.global_ctx = output.global_ctx;
        }
        if merged.cache_state.is_none() {
            merged.cache_state = output.cache_state;
        }
        if merged.changed_files.is_none() {
            merged.changed_files = output.changed_files;
        }

        for error in output.errors.into_iter().skip(base_error_count) {
            merged.errors.push(error);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use async_trait::async_trait;
    use codeweave_ir::IRDocument;

    struct MarkerStage {
        name: &'static str,
        skip: bool,
        fail: bool,
    }

    #[async_trait]
    impl PipelineStage for MarkerStage {
        fn name(&self) -> &'static str {
            self.name
        }

        fn should_skip(&self, _ctx: &StageContext) -> (bool, Option<String>) {
            (self.skip, self.skip.then(|| "disabled".to_string()))
        }

        async fn run(&self, mut ctx: StageContext) -> crate::protocol::StageResult {
            if self.fail {
                let err = PipelineError::stage(self.name, "boom");
                return Err(crate::protocol::StageFailure::new(ctx, err));
            }
            ctx.ir_documents.insert(
                self.name.to_string(),
                IRDocument::new(
                    "repo".to_string(),
                    "snap".to_string(),
                    self.name.to_string(),
                    "python".to_string(),
                ),
            );
            Ok(ctx)
        }
    }

    fn orchestrator(stages: Vec<Arc<dyn PipelineStage>>) -> StageOrchestrator {
        StageOrchestrator::new(
            stages,
            Arc::new(PipelineHooks::new()),
            CancellationToken::new(),
        )
    }

    fn ctx() -> StageContext {
        StageContext::new(Vec::new(), Arc::new(BuildConfig::default()))
    }

    #[tokio::test]
    async fn test_sequential_execution_order_and_metrics() {
        let orch = orchestrator(vec![
            Arc::new(MarkerStage { name: "one", skip: false, fail: false }),
            Arc::new(MarkerStage { name: "two", skip: false, fail: false }),
        ]);

        let outcome = orch.execute(ctx()).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.ctx.stage_metrics.len(), 2);
        assert_eq!(outcome.ctx.stage_metrics[0].stage_name, "one");
        assert_eq!(outcome.ctx.stage_metrics[1].stage_name, "two");
        assert_eq!(outcome.ctx.ir_documents.len(), 2);
    }

    #[tokio::test]
    async fn test_skipped_stage_produces_no_metric() {
        let orch = orchestrator(vec![
            Arc::new(MarkerStage { name: "one", skip: true, fail: false }),
            Arc::new(MarkerStage { name: "two", skip: false, fail: false }),
        ]);

        let outcome = orch.execute(ctx()).await;
        assert_eq!(outcome.ctx.stage_metrics.len(), 1);
        assert_eq!(outcome.ctx.stage_metrics[0].stage_name, "two");
        assert!(!outcome.ctx.ir_documents.contains_key("one"));
    }

    #[tokio::test]
    async fn test_stage_failure_aborts() {
        let orch = orchestrator(vec![
            Arc::new(MarkerStage { name: "one", skip: false, fail: false }),
            Arc::new(MarkerStage { name: "two", skip: false, fail: true }),
            Arc::new(MarkerStage { name: "three", skip: false, fail: false }),
        ]);

        let outcome = orch.execute(ctx()).await;
        let error = outcome.error.expect("pipeline should abort");
        assert!(error.to_string().contains("two"));
        // Stage one's output survives; stage three never ran
        assert!(outcome.ctx.ir_documents.contains_key("one"));
        assert!(!outcome.ctx.ir_documents.contains_key("three"));
    }

    #[tokio::test]
    async fn test_cancellation_at_stage_boundary() {
        let token = CancellationToken::new();
        let orch = StageOrchestrator::new(
            vec![Arc::new(MarkerStage { name: "one", skip: false, fail: false })],
            Arc::new(PipelineHooks::new()),
            token.clone(),
        );
        token.cancel();

        let outcome = orch.execute(ctx()).await;
        assert!(matches!(outcome.error, Some(PipelineError::Cancelled)));
        assert!(outcome.ctx.ir_documents.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_group_merges_documents_and_metrics() {
        let orch = orchestrator(vec![
            Arc::new(MarkerStage { name: "one", skip: false, fail: false }),
            Arc::new(MarkerStage { name: "two", skip: false, fail: false }),
            Arc::new(MarkerStage { name: "three", skip: false, fail: false }),
        ]);

        let outcome = orch.execute_parallel(ctx(), &[vec![0], vec![1, 2]]).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.ctx.ir_documents.len(), 3);
        assert_eq!(outcome.ctx.stage_metrics.len(), 3);
    }

    #[tokio::test]
    async fn test_parallel_group_error_aborts() {
        let orch = orchestrator(vec![
            Arc::new(MarkerStage { name: "one", skip: false, fail: false }),
            Arc::new(MarkerStage { name: "two", skip: false, fail: true }),
        ]);

        let outcome = orch.execute_parallel(ctx(), &[vec![0, 1]]).await;
        assert!(outcome.error.is_some());
    }
}
