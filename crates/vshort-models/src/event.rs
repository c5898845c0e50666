//! Pipeline events and the line protocol.
//!
//! The calling process reads the pipeline's stdout line by line, so the
//! wire format of every event is fixed:
//!
//! | event              | channel | line                          |
//! |--------------------|---------|-------------------------------|
//! | `Status`           | stdout  | `STATUS: <message>`           |
//! | `DownloadProgress` | stdout  | `PROGRESS:DOWNLOAD:<percent>` |
//! | `RenderProgress`   | stdout  | `PROGRESS:RENDER:<0.00>`      |
//! | `Output`           | stdout  | `RESULT:<path>`               |
//! | `Success`          | stdout  | `LINK_SUCCESS`                |
//! | `Failure`          | stdout  | `LINK_ERROR: <message>`       |
//! | `Warning`          | stdout  | `WARNING: <message>`          |
//! | `ToolOutput`       | stdout  | raw tool line                 |
//! | `ToolError`        | stderr  | `FFMPEG_ERROR: <line>`        |
//! | `Diagnostic`       | stderr  | `PYTHON_ERROR: <message>`     |
//!
//! The `PYTHON_ERROR` tag predates this implementation; existing callers
//! match on it, so it is kept verbatim.

use std::path::PathBuf;

/// Tag for pipeline diagnostics on stderr.
pub const DIAGNOSTIC_TAG: &str = "PYTHON_ERROR";
/// Tag for external tool diagnostics on stderr.
pub const TOOL_ERROR_TAG: &str = "FFMPEG_ERROR";

/// Which standard stream an event is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    Stdout,
    Stderr,
}

/// Something the pipeline reports to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Human-readable narration
    Status(String),
    /// Download progress (0-100)
    DownloadProgress(f64),
    /// Render progress (0-100)
    RenderProgress(f64),
    /// A finished segment file
    Output(PathBuf),
    /// Terminal success marker
    Success,
    /// Terminal failure marker
    Failure(String),
    /// Non-fatal problem
    Warning(String),
    /// Line passed through from an external tool's stdout
    ToolOutput(String),
    /// Buffered stderr line of a failed external tool
    ToolError(String),
    /// Pipeline-level error detail
    Diagnostic(String),
}

impl PipelineEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status(message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    /// The stream this event belongs on.
    pub fn channel(&self) -> OutputChannel {
        match self {
            Self::ToolError(_) | Self::Diagnostic(_) => OutputChannel::Stderr,
            _ => OutputChannel::Stdout,
        }
    }

    /// Render the event as one protocol line (without the trailing newline).
    pub fn to_line(&self) -> String {
        match self {
            Self::Status(message) => format!("STATUS: {message}"),
            Self::DownloadProgress(percent) => format!("PROGRESS:DOWNLOAD:{percent}"),
            Self::RenderProgress(percent) => format!("PROGRESS:RENDER:{percent:.2}"),
            Self::Output(path) => format!("RESULT:{}", path.display()),
            Self::Success => "LINK_SUCCESS".to_string(),
            Self::Failure(message) => format!("LINK_ERROR: {}", single_line(message)),
            Self::Warning(message) => format!("WARNING: {}", single_line(message)),
            Self::ToolOutput(line) => line.clone(),
            Self::ToolError(line) => format!("{TOOL_ERROR_TAG}: {line}"),
            Self::Diagnostic(message) => format!("{DIAGNOSTIC_TAG}: {}", single_line(message)),
        }
    }
}

/// Receiver of pipeline events.
///
/// Implementations must be cheap and non-blocking; events are emitted from
/// the tool reader tasks as well as from the orchestrator.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Keep multi-line messages from breaking the line protocol.
fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
