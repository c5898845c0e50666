//! Source fetching and video track normalization.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use vshort_media::fs_utils::remove_file_if_exists;
use vshort_media::inline_image::write_inline_image;
use vshort_media::intermediate::{loop_command, retime_command, strip_audio_command};
use vshort_media::{MediaError, ProgressMode};
use vshort_models::encoding::DOWNLOAD_VIDEO_CONTAINER;
use vshort_models::timeline::{covers, loop_count, needs_retime, retimed_duration};
use vshort_models::{sanitize_filename, EncoderProfile, Layout, PipelineEvent, VideoTrack};

use super::Pipeline;
use crate::error::{PipelineError, PipelineResult};

/// Audio, thumbnail and title shared by every part.
pub(super) struct SourceAudio {
    pub title: String,
    pub audio: PathBuf,
    pub thumbnail: PathBuf,
}

/// A downloaded, audio-stripped video at its natural speed.
pub(super) struct TrackDownload {
    number: usize,
    stem: String,
    speed: f64,
    placeholder_id: String,
    pub path: PathBuf,
}

impl TrackDownload {
    pub fn label(&self) -> String {
        format!("video {}", self.number)
    }
}

/// A video track that covers the whole audio timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTrack {
    /// Layout item the track is bound to
    pub placeholder_id: String,
    pub path: PathBuf,
    /// Effective duration in seconds, after retiming and looping
    pub duration: f64,
}

impl Pipeline {
    /// Fetch the title, audio and thumbnail from the audio URL.
    pub(super) async fn fetch_source(&self, url: &str) -> PipelineResult<SourceAudio> {
        self.status("Fetching audio metadata...");
        let metadata = self
            .fetcher
            .fetch_metadata(url)
            .await
            .map_err(PipelineError::Fetch)?;

        let mut title = sanitize_filename(metadata.display_title());
        if title.is_empty() {
            title = sanitize_filename(&metadata.id);
        }
        let id = sanitize_filename(&metadata.id);
        info!(id = %metadata.id, title = %title, "Audio source resolved");

        let audio = self.config.scratch_dir.join(format!("{id}_audio.mp3"));
        self.status("Downloading audio...");
        self.fetcher
            .download_audio(url, &audio)
            .await
            .map_err(PipelineError::Fetch)?;

        let thumbnail_url = metadata.thumbnail.as_deref().ok_or_else(|| {
            PipelineError::Fetch(MediaError::download_failed(format!(
                "No thumbnail available for {url}"
            )))
        })?;
        let thumbnail = self.config.scratch_dir.join(format!("{id}_thumb.jpg"));
        self.status("Downloading thumbnail...");
        self.fetcher
            .download_thumbnail(thumbnail_url, &thumbnail)
            .await
            .map_err(PipelineError::Fetch)?;

        Ok(SourceAudio {
            title,
            audio,
            thumbnail,
        })
    }

    /// Download video `number` and keep only its video stream.
    ///
    /// The muxed download is removed whether or not the strip succeeds.
    pub(super) async fn fetch_track(
        &self,
        number: usize,
        track: &VideoTrack,
    ) -> PipelineResult<TrackDownload> {
        self.status(format!("Fetching metadata for video {number}..."));
        let metadata = self
            .fetcher
            .fetch_metadata(&track.url)
            .await
            .map_err(PipelineError::Fetch)?;

        let stem = format!("{}_video{number}", sanitize_filename(&metadata.id));
        let raw = self
            .config
            .scratch_dir
            .join(format!("{stem}_raw.{DOWNLOAD_VIDEO_CONTAINER}"));
        let path = self
            .config
            .scratch_dir
            .join(format!("{stem}.{DOWNLOAD_VIDEO_CONTAINER}"));

        self.status(format!("Downloading video {number}..."));
        self.fetcher
            .download_video(&track.url, &raw)
            .await
            .map_err(PipelineError::Fetch)?;

        self.status(format!("Removing audio from video {number}..."));
        let stripped = self
            .toolkit
            .run_ffmpeg(&strip_audio_command(&raw, &path), ProgressMode::Silent)
            .await;
        if let Err(e) = remove_file_if_exists(&raw).await {
            warn!(path = %raw.display(), "Failed to remove muxed download: {}", e);
        }
        stripped?;

        Ok(TrackDownload {
            number,
            stem,
            speed: track.speed,
            placeholder_id: track.placeholder_id.clone(),
            path,
        })
    }

    /// Retime a track to its playback speed, then loop it to cover the audio.
    pub(super) async fn normalize_track(
        &self,
        download: TrackDownload,
        natural_duration: f64,
        audio_duration: f64,
        encoder: &EncoderProfile,
    ) -> PipelineResult<PreparedTrack> {
        let TrackDownload {
            number,
            stem,
            speed,
            placeholder_id,
            mut path,
        } = download;
        let mut duration = natural_duration;

        if needs_retime(speed) {
            self.status(format!("Applying {speed}x speed to video {number}..."));
            let output = self.scratch_file(&stem, "speeded");
            self.toolkit
                .run_ffmpeg(
                    &retime_command(&path, &output, speed, encoder),
                    ProgressMode::Silent,
                )
                .await?;
            path = output;
            duration = retimed_duration(natural_duration, speed);
        }

        if let Some(loops) = loop_count(duration, audio_duration) {
            self.status(format!(
                "Video {number} ({duration:.2}s) is shorter than the audio ({audio_duration:.2}s). Looping it..."
            ));
            let output = self.scratch_file(&stem, "looped");
            self.toolkit
                .run_ffmpeg(
                    &loop_command(&path, &output, loops, audio_duration, encoder),
                    ProgressMode::Silent,
                )
                .await?;
            path = output;
            duration = audio_duration;
        }

        if !covers(duration, audio_duration) {
            return Err(PipelineError::Coverage {
                track: placeholder_id,
                covered: duration,
                required: audio_duration,
            });
        }

        debug!(
            track = %placeholder_id,
            natural_secs = natural_duration,
            effective_secs = duration,
            speed,
            "Track normalized"
        );
        Ok(PreparedTrack {
            placeholder_id,
            path,
            duration,
        })
    }

    /// Decode every inline layout image into the scratch directory.
    ///
    /// Images that fail to decode are reported and left out.
    pub(super) async fn write_inline_images(&self, layout: &Layout) -> Vec<(String, PathBuf)> {
        let mut images = Vec::new();
        for (index, item) in layout.inline_images() {
            let Some(uri) = item.inline_image_source() else {
                continue;
            };
            match write_inline_image(index, &item.id, uri, &self.config.scratch_dir).await {
                Ok(path) => images.push((item.id.clone(), path)),
                Err(e) => {
                    warn!(item = %item.id, "Skipping inline image: {}", e);
                    self.sink.emit(PipelineEvent::warning(format!(
                        "Failed to decode image {}: {e}",
                        item.id
                    )));
                }
            }
        }
        images
    }

    fn scratch_file(&self, stem: &str, suffix: &str) -> PathBuf {
        scratch_path(&self.config.scratch_dir, stem, suffix)
    }
}

fn scratch_path(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{stem}_{suffix}.{DOWNLOAD_VIDEO_CONTAINER}"))
}
