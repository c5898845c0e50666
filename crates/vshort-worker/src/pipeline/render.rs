//! Per-part segment renders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use vshort_media::filters::compile_layout;
use vshort_media::{FfmpegCommand, ProgressMode};
use vshort_models::layout::THUMBNAIL_PLACEHOLDER;
use vshort_models::{EncoderProfile, Layout, LayoutElement, SegmentWindow};

use super::{Pipeline, PreparedTrack};
use crate::error::{PipelineError, PipelineResult};

/// Everything a segment render reads; identical for every part.
pub(super) struct SegmentSources<'a> {
    pub layout: &'a Layout,
    pub title: &'a str,
    pub audio: &'a Path,
    pub thumbnail: &'a Path,
    pub tracks: &'a [PreparedTrack],
    pub inline_images: &'a [(String, PathBuf)],
    pub encoder: &'a EncoderProfile,
    pub output_dir: &'a Path,
}

impl SegmentSources<'_> {
    fn output_path(&self, part_number: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_Part_{part_number}.mp4", self.title))
    }

    /// Build the render command for one window.
    ///
    /// Inputs are attached as videos, thumbnail, inline images, then audio.
    fn command(
        &self,
        window: &SegmentWindow,
        output: &Path,
        assets_root: &Path,
        cpu_count: usize,
    ) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output);
        let mut inputs = HashMap::new();

        for track in self.tracks {
            inputs.insert(track.placeholder_id.clone(), cmd.add_input(&track.path));
        }

        let thumbnail = cmd.add_input(self.thumbnail);
        inputs.insert(THUMBNAIL_PLACEHOLDER.to_string(), thumbnail);
        for item in self.layout.items() {
            if matches!(item.element, LayoutElement::Thumbnail) {
                inputs.insert(item.id.clone(), thumbnail);
            }
        }

        for (id, path) in self.inline_images {
            inputs.insert(id.clone(), cmd.add_input(path));
        }

        let audio = cmd.add_input(self.audio);

        let graph = compile_layout(
            self.layout,
            &inputs,
            window.start,
            window.duration,
            window.part_number,
            assets_root,
        )
        .bind_audio(audio);

        cmd.filter_complex(&graph.expression)
            .map(graph.video_map())
            .map(graph.audio_map())
            .output_args(self.encoder.segment_args(cpu_count))
            .output_args(EncoderProfile::segment_output_args())
    }
}

impl Pipeline {
    /// Render one part to `<output>/<title>_Part_<n>.mp4`.
    pub(super) async fn render_segment(
        &self,
        sources: &SegmentSources<'_>,
        window: &SegmentWindow,
        part_count: usize,
    ) -> PipelineResult<PathBuf> {
        let part = window.part_number;
        self.status(format!("Render Part {part}/{part_count}..."));

        let output = sources.output_path(part);
        let cmd = sources.command(
            window,
            &output,
            &self.config.resources_dir,
            self.config.cpu_count,
        );

        info!(
            part,
            start_secs = window.start,
            duration_secs = window.duration,
            output = %output.display(),
            "Rendering part"
        );
        self.status(format!(
            "Starting ffmpeg for Part {part} (this can take a few minutes)..."
        ));
        self.toolkit
            .run_ffmpeg(
                &cmd,
                ProgressMode::Render {
                    total_secs: window.duration,
                },
            )
            .await
            .map_err(|source| PipelineError::Render { part, source })?;

        Ok(output)
    }
}
