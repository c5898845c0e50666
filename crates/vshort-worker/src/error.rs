//! Pipeline error types.

use thiserror::Error;

use vshort_media::MediaError;
use vshort_models::{JobError, LayoutError, PlanError};

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[source] MediaError),

    #[error("Cannot determine the length of {0}")]
    Probe(String),

    #[error("{track} lasts {covered:.2}s but the audio lasts {required:.2}s")]
    Coverage {
        track: String,
        covered: f64,
        required: f64,
    },

    #[error("Render failed for part {part}: {source}")]
    Render {
        part: usize,
        #[source]
        source: MediaError,
    },

    #[error(transparent)]
    Tool(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Invalid arguments: {0}")]
    Usage(String),
}

impl PipelineError {
    /// Text for the terminal `LINK_ERROR` line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(MediaError::AuthRequired { message }) => {
                format!("Video requires cookies: {message}")
            }
            other => other.to_string(),
        }
    }

    /// Whether the failure happened before any network or render work.
    pub fn is_startup_failure(&self) -> bool {
        match self {
            Self::Config(_) | Self::InvalidJob(_) | Self::Usage(_) => true,
            Self::Tool(e) => e.is_missing_dependency(),
            _ => false,
        }
    }
}

impl From<LayoutError> for PipelineError {
    fn from(e: LayoutError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<JobError> for PipelineError {
    fn from(e: JobError) -> Self {
        Self::InvalidJob(e.to_string())
    }
}

/// Keeps clap's message and drops the usage and help hints after it.
impl From<clap::Error> for PipelineError {
    fn from(e: clap::Error) -> Self {
        let rendered = e.to_string();
        let message = rendered.split("\n\n").next().unwrap_or_default();
        Self::Usage(message.trim_start_matches("error:").trim().to_string())
    }
}

impl From<PlanError> for PipelineError {
    fn from(e: PlanError) -> Self {
        Self::InvalidJob(e.to_string())
    }
}
