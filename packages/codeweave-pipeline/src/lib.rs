//! codeweave-pipeline — async stage pipeline over the IR core.
//!
//! Composable stages (cache, structural, semantic, cross-file, provenance)
//! driven by an orchestrator with skip logic, hooks, per-stage metrics,
//! parallel groups, and cancellation at stage boundaries.

pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod protocol;
pub mod stages;

pub use config::{BuildConfig, Profile};
pub use context::{CacheState, StageContext};
pub use error::{PipelineError, Result};
pub use orchestrator::{ExecutionOutcome, StageOrchestrator};
pub use pipeline::{IrPipeline, PipelineBuilder, PipelineResult};
pub use protocol::{PipelineHooks, PipelineStage, StageFailure, StageMetrics, StageResult};
