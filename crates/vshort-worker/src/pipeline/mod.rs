//! The clip pipeline.
//!
//! One run: fetch the audio, thumbnail and video sources, bring every video
//! track up to the audio's length (retime, then loop), cut the audio timeline
//! into parts and render each part through the compiled layout. The scratch
//! directory is removed when the run ends, whatever the outcome.

mod prepare;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use vshort_media::fs_utils::remove_dir_all_if_exists;
use vshort_media::{MediaFetcher, MediaToolkit};
use vshort_models::{EventSink, JobSpec, Layout, PipelineEvent, SegmentPlan};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};

pub use prepare::PreparedTrack;

/// Orchestrates one clip-building job.
pub struct Pipeline {
    config: WorkerConfig,
    fetcher: Arc<dyn MediaFetcher>,
    toolkit: Arc<dyn MediaToolkit>,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    pub fn new(
        config: WorkerConfig,
        fetcher: Arc<dyn MediaFetcher>,
        toolkit: Arc<dyn MediaToolkit>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            fetcher,
            toolkit,
            sink,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the job, report its outcome and clean up.
    ///
    /// Emits one `RESULT` per finished part, then `LINK_SUCCESS`; on failure
    /// emits the diagnostic and `LINK_ERROR`. Parts finished before a failure
    /// stay on disk.
    pub async fn run(&self, job: &JobSpec) -> PipelineResult<Vec<PathBuf>> {
        let result = self.execute(job).await;

        match &result {
            Ok(outputs) => {
                info!(parts = outputs.len(), "Job finished");
                self.status("All parts finished!");
                self.sink.emit(PipelineEvent::Success);
            }
            Err(e) => report_failure(self.sink.as_ref(), e),
        }

        self.cleanup().await;
        result
    }

    async fn execute(&self, job: &JobSpec) -> PipelineResult<Vec<PathBuf>> {
        job.validate()?;

        let layout = Layout::from_file(&job.layout_path)?;
        info!(
            layout = %job.layout_path.display(),
            items = layout.len(),
            tracks = job.videos.len(),
            "Starting job"
        );

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        let output_dir = std::path::absolute(&self.config.output_dir)?;

        let source = self.fetch_source(&job.audio_url).await?;

        let mut downloads = Vec::with_capacity(job.videos.len());
        for (i, track) in job.videos.iter().enumerate() {
            downloads.push(self.fetch_track(i + 1, track).await?);
        }

        let audio_duration = self.read_duration(&source.audio, "the audio").await?;

        let mut natural_durations = Vec::with_capacity(downloads.len());
        for download in &downloads {
            natural_durations.push(self.read_duration(&download.path, &download.label()).await?);
        }

        let mut tracks = Vec::with_capacity(downloads.len());
        for (download, natural) in downloads.into_iter().zip(natural_durations) {
            tracks.push(
                self.normalize_track(download, natural, audio_duration, &job.encoder)
                    .await?,
            );
        }

        let plan = SegmentPlan::compute(
            job.requested_parts,
            job.requested_part_duration,
            audio_duration,
        )?;
        info!(
            parts = plan.part_count,
            part_duration_secs = plan.part_duration,
            audio_duration_secs = audio_duration,
            "Segment plan"
        );

        let inline_images = self.write_inline_images(&layout).await;

        let segments = render::SegmentSources {
            layout: &layout,
            title: &source.title,
            audio: &source.audio,
            thumbnail: &source.thumbnail,
            tracks: &tracks,
            inline_images: &inline_images,
            encoder: &job.encoder,
            output_dir: &output_dir,
        };

        let mut outputs = Vec::with_capacity(plan.part_count);
        for window in plan.windows() {
            let output = self
                .render_segment(&segments, &window, plan.part_count)
                .await?;
            self.sink.emit(PipelineEvent::Output(output.clone()));
            outputs.push(output);
        }

        Ok(outputs)
    }

    /// Read a file's duration. An unknown duration is reported and fails the job.
    async fn read_duration(&self, path: &Path, label: &str) -> PipelineResult<f64> {
        let duration = self.toolkit.probe_duration(path).await;
        if duration > 0.0 {
            return Ok(duration);
        }
        self.sink.emit(PipelineEvent::warning(format!(
            "Could not read the duration of {label} ({})",
            path.display()
        )));
        Err(PipelineError::Probe(label.to_string()))
    }

    async fn cleanup(&self) {
        remove_scratch(self.sink.as_ref(), &self.config.scratch_dir).await;
    }

    fn status(&self, message: impl Into<String>) {
        self.sink.emit(PipelineEvent::status(message));
    }
}

/// Remove the scratch directory. A failed removal is only a warning.
pub async fn remove_scratch(sink: &dyn EventSink, scratch_dir: &Path) {
    sink.emit(PipelineEvent::status("Cleaning up temporary files..."));
    if let Err(e) = remove_dir_all_if_exists(scratch_dir).await {
        warn!(dir = %scratch_dir.display(), "Failed to remove scratch directory: {}", e);
        sink.emit(PipelineEvent::warning(format!(
            "Could not remove temp directory: {e}"
        )));
    }
}

/// Emit the diagnostic and the terminal `LINK_ERROR` line for a failure.
pub fn report_failure(sink: &dyn EventSink, err: &PipelineError) {
    if err.is_startup_failure() {
        error!("Cannot start job: {}", err);
    } else {
        error!("Job failed: {}", err);
    }
    sink.emit(PipelineEvent::Diagnostic(err.to_string()));
    sink.emit(PipelineEvent::Failure(err.user_message()));
}
