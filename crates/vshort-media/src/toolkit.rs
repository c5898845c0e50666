//! The ffmpeg/ffprobe capability the pipeline renders through.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use vshort_models::EventSink;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::probe::probe_duration;
use crate::runner::{ProcessRunner, ProgressMode};

/// Probing and rendering.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Duration of a media file in seconds; `0.0` when it cannot be determined.
    async fn probe_duration(&self, path: &Path) -> f64;

    /// Run an ffmpeg command to completion.
    async fn run_ffmpeg(&self, command: &FfmpegCommand, mode: ProgressMode) -> MediaResult<()>;
}

/// [`MediaToolkit`] backed by the ffmpeg and ffprobe binaries.
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    runner: ProcessRunner,
}

impl FfmpegToolkit {
    pub fn new(
        ffmpeg: impl AsRef<Path>,
        ffprobe: impl AsRef<Path>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.as_ref().to_path_buf(),
            ffprobe: ffprobe.as_ref().to_path_buf(),
            runner: ProcessRunner::new(sink),
        }
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> f64 {
        probe_duration(&self.ffprobe, path).await
    }

    async fn run_ffmpeg(&self, command: &FfmpegCommand, mode: ProgressMode) -> MediaResult<()> {
        self.runner
            .execute(&command.to_tool_command(&self.ffmpeg), mode)
            .await
    }
}
