//! Crate-wide error taxonomy.
//!
//! Each per-document failure is isolated to that document; nothing here
//! aborts a batch. [`PipelineError`] carries the category used for
//! statistics and logging; lower layers raise their own typed errors and
//! convert with `#[from]`.

use thiserror::Error;

/// Per-document failure category. Mirrors the severity policy: everything
/// isolates to one document and is logged with its `documentId`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("insufficient extracted text ({chars} chars, need >= {min})")]
    InsufficientText { chars: usize, min: usize },

    #[error("rasterization unavailable: {0}")]
    RasterizationMissing(String),

    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] diesel::result::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<crate::raster::RasterError> for PipelineError {
    fn from(e: crate::raster::RasterError) -> Self {
        match e {
            crate::raster::RasterError::ToolNotFound(tool) => {
                PipelineError::RasterizationMissing(tool)
            }
            other => PipelineError::Unknown(other.to_string()),
        }
    }
}

impl From<crate::text_extract::ExtractError> for PipelineError {
    fn from(e: crate::text_extract::ExtractError) -> Self {
        match e {
            crate::text_extract::ExtractError::ToolNotFound(tool) => {
                PipelineError::RasterizationMissing(tool)
            }
            other => PipelineError::Unknown(other.to_string()),
        }
    }
}

impl From<crate::llm::LlmError> for PipelineError {
    fn from(e: crate::llm::LlmError) -> Self {
        PipelineError::ModelInvocation(e.to_string())
    }
}

impl PipelineError {
    /// Short category tag used in structured log fields and statistics.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InsufficientText { .. } => "InsufficientText",
            PipelineError::RasterizationMissing(_) => "RasterizationMissing",
            PipelineError::ModelInvocation(_) => "ModelInvocation",
            PipelineError::Validation(_) => "Validation",
            PipelineError::Persistence(_) => "Persistence",
            PipelineError::Cancelled => "Cancelled",
            PipelineError::Unknown(_) => "Unknown",
        }
    }
}
