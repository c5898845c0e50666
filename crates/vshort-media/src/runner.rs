//! External tool execution.
//!
//! Every ffmpeg, ffprobe and yt-dlp invocation goes through [`spawn_tool`]:
//! stdin is closed, both output channels are piped and the child is killed
//! if its handle is dropped. Output is split on `\n` and `\r` (ffmpeg redraws
//! its stats line with carriage returns) and decoded as lossy UTF-8.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use vshort_models::{EventSink, PipelineEvent};

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};
use crate::progress::{parse_download_percent, FfmpegProgress};

/// Number of stderr lines kept in a [`MediaError::ToolFailed`].
pub const STDERR_TAIL_LINES: usize = 20;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// How a tool's output is interpreted while it runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressMode {
    /// No progress reporting
    Silent,
    /// ffmpeg render of `total_secs` seconds; stats lines become render progress
    Render { total_secs: f64 },
    /// yt-dlp download; `[download] NN%` stdout lines become download progress
    Download,
}

/// Start an external tool with the shared spawning policy.
pub fn spawn_tool(cmd: &ToolCommand) -> MediaResult<Child> {
    Command::new(cmd.program())
        .args(cmd.get_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                missing_tool(&cmd.program_name()).unwrap_or(MediaError::Io(e))
            } else {
                MediaError::Io(e)
            }
        })
}

fn missing_tool(name: &str) -> Option<MediaError> {
    match name {
        "ffmpeg" => Some(MediaError::FfmpegNotFound),
        "ffprobe" => Some(MediaError::FfprobeNotFound),
        "yt-dlp" => Some(MediaError::YtDlpNotFound),
        _ => None,
    }
}

/// Output of a tool run to completion with [`capture`].
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a short-lived tool and collect both channels.
pub async fn capture(cmd: &ToolCommand) -> MediaResult<CapturedOutput> {
    debug!("Running: {}", cmd.display());
    let child = spawn_tool(cmd)?;
    let output = child.wait_with_output().await?;

    Ok(CapturedOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Runs long-lived tools while streaming their output as pipeline events.
#[derive(Clone)]
pub struct ProcessRunner {
    sink: Arc<dyn EventSink>,
    /// Replay buffered stderr as `FFMPEG_ERROR` lines on failure
    echo_errors: bool,
}

impl ProcessRunner {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            echo_errors: true,
        }
    }

    /// Do not replay stderr on failure; the caller reports the error itself.
    pub fn without_error_echo(mut self) -> Self {
        self.echo_errors = false;
        self
    }

    /// Run a tool to completion.
    ///
    /// stdout and stderr are drained by two concurrent tasks which are joined
    /// before the exit status is inspected. stdout lines are forwarded live
    /// (or turned into download progress); stderr lines are turned into render
    /// progress when they carry a stats timestamp and buffered otherwise.
    pub async fn execute(&self, cmd: &ToolCommand, mode: ProgressMode) -> MediaResult<()> {
        let program = cmd.program_name();
        debug!(program = %program, "Running: {}", cmd.display());

        let mut child = spawn_tool(cmd)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;

        let out_sink = Arc::clone(&self.sink);
        let stdout_task = tokio::spawn(async move {
            let mut captured = Vec::new();
            read_lines(stdout, |line| {
                match mode {
                    ProgressMode::Download => match parse_download_percent(&line) {
                        Some(percent) => out_sink.emit(PipelineEvent::DownloadProgress(percent)),
                        None => debug!("{}", line),
                    },
                    _ => out_sink.emit(PipelineEvent::ToolOutput(line.clone())),
                }
                captured.push(line);
            })
            .await
            .map(|_| captured)
        });

        let err_sink = Arc::clone(&self.sink);
        let stderr_task = tokio::spawn(async move {
            let mut buffered = Vec::new();
            read_lines(stderr, |line| {
                if let ProgressMode::Render { total_secs } = mode {
                    if let Some(progress) = FfmpegProgress::from_stats_line(&line) {
                        err_sink.emit(PipelineEvent::RenderProgress(progress.percentage(total_secs)));
                        return;
                    }
                }
                buffered.push(line);
            })
            .await
            .map(|_| buffered)
        });

        let stdout_lines = join_reader(stdout_task).await?;
        let stderr_lines = join_reader(stderr_task).await?;
        let status = child.wait().await?;

        if status.success() {
            debug!(program = %program, "Tool finished");
            return Ok(());
        }

        warn!(
            program = %program,
            exit_code = ?status.code(),
            "Tool exited with non-zero status"
        );

        if self.echo_errors {
            for line in &stderr_lines {
                self.sink.emit(PipelineEvent::ToolError(line.clone()));
            }
        }

        let tail_start = stderr_lines.len().saturating_sub(STDERR_TAIL_LINES);
        Err(MediaError::tool_failed(
            program,
            status.code(),
            stderr_lines[tail_start..].join("\n"),
            stdout_lines.join("\n"),
        ))
    }
}

async fn join_reader(
    task: tokio::task::JoinHandle<std::io::Result<Vec<String>>>,
) -> MediaResult<Vec<String>> {
    task.await
        .map_err(|e| MediaError::internal(format!("output reader task failed: {e}")))?
        .map_err(MediaError::from)
}

/// Drain `reader`, calling `on_line` for every non-empty line.
async fn read_lines<R, F>(mut reader: R, mut on_line: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut splitter = LineSplitter::default();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for line in splitter.push(&buf[..n]) {
            on_line(line);
        }
    }

    if let Some(line) = splitter.finish() {
        on_line(line);
    }
    Ok(())
}

/// Splits a byte stream on `\n` and `\r`.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).to_string();
        self.pending.clear();
        Some(line)
    }
}
