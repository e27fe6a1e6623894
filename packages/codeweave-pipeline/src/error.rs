//! Pipeline error types.

use thiserror::Error;

/// Errors that abort the pipeline. Per-file faults never become one of
/// these; they are contained inside their stage and recorded as strings on
/// the context.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage}: {message}")]
    Stage { stage: String, message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("{stage}: timed out after {seconds}s")]
    Timeout { stage: String, seconds: u64 },

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Ir(#[from] codeweave_ir::CodeweaveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display_is_prefixed() {
        let err = PipelineError::stage("CacheStage", "stat failed");
        assert_eq!(err.to_string(), "CacheStage: stat failed");
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(PipelineError::Cancelled.to_string(), "cancelled");
    }
}
