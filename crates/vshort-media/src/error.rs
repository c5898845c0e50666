//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching, probing or rendering media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Dependency missing: ffmpeg not found")]
    FfmpegNotFound,

    #[error("Dependency missing: ffprobe not found")]
    FfprobeNotFound,

    #[error("Dependency missing: yt-dlp not found")]
    YtDlpNotFound,

    /// An external tool exited with a non-zero status.
    #[error("{program} exited with code {}: {stderr_tail}", exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ToolFailed {
        program: String,
        exit_code: Option<i32>,
        stderr_tail: String,
        stdout: String,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    /// The platform answered HTTP 403; a cookie file is required.
    #[error("Video requires authentication cookies: {message}")]
    AuthRequired { message: String },

    #[error("Invalid inline image: {0}")]
    InvalidDataUri(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a tool failure error.
    pub fn tool_failed(
        program: impl Into<String>,
        exit_code: Option<i32>,
        stderr_tail: impl Into<String>,
        stdout: impl Into<String>,
    ) -> Self {
        Self::ToolFailed {
            program: program.into(),
            exit_code,
            stderr_tail: stderr_tail.into(),
            stdout: stdout.into(),
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create an authentication-required error.
    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::AuthRequired {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Exit code of a failed tool, if this is a tool failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ToolFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Whether this error means a required external binary is missing.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(
            self,
            Self::FfmpegNotFound | Self::FfprobeNotFound | Self::YtDlpNotFound
        )
    }
}
