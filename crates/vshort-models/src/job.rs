//! Job description.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::EncoderProfile;
use crate::layout::{VIDEO_PLACEHOLDER, VIDEO_PLACEHOLDER_1, VIDEO_PLACEHOLDER_2};

/// Maximum number of video tracks in one job.
pub const MAX_VIDEO_TRACKS: usize = 2;

/// Errors raised by job validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error("Expected 1 or 2 video URLs, got {0}")]
    VideoCount(usize),

    #[error("Got {urls} video URLs but {speeds} speeds")]
    SpeedCount { urls: usize, speeds: usize },

    #[error("Video speed must be positive (got {0})")]
    InvalidSpeed(f64),

    #[error("Part count must be at least 1 (got {0})")]
    InvalidPartCount(i64),

    #[error("Missing URL: {0}")]
    MissingUrl(&'static str),
}

/// One video source and how it is bound into the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Source URL
    pub url: String,
    /// Playback speed multiplier
    pub speed: f64,
    /// Layout item id this track is drawn into
    pub placeholder_id: String,
}

impl VideoTrack {
    /// Pair URLs with speeds and assign placeholder ids.
    ///
    /// A single track binds to `video-placeholder`; two tracks bind to
    /// `video-placeholder-1` and `video-placeholder-2`. Missing speeds
    /// default to 1.0.
    pub fn from_sources(urls: &[String], speeds: &[f64]) -> Result<Vec<Self>, JobError> {
        if urls.is_empty() || urls.len() > MAX_VIDEO_TRACKS {
            return Err(JobError::VideoCount(urls.len()));
        }
        if speeds.len() > urls.len() {
            return Err(JobError::SpeedCount {
                urls: urls.len(),
                speeds: speeds.len(),
            });
        }

        let placeholders: &[&str] = if urls.len() == 1 {
            &[VIDEO_PLACEHOLDER]
        } else {
            &[VIDEO_PLACEHOLDER_1, VIDEO_PLACEHOLDER_2]
        };

        Ok(urls
            .iter()
            .zip(placeholders)
            .enumerate()
            .map(|(i, (url, placeholder))| VideoTrack {
                url: url.clone(),
                speed: speeds.get(i).copied().unwrap_or(1.0),
                placeholder_id: (*placeholder).to_string(),
            })
            .collect())
    }
}

/// Everything one run of the pipeline needs to know about the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// URL supplying the audio, the thumbnail and the output title
    pub audio_url: String,
    /// One or two video tracks
    pub videos: Vec<VideoTrack>,
    /// Requested number of parts
    pub requested_parts: i64,
    /// Requested part length in seconds; <= 0 derives it from the part count
    pub requested_part_duration: f64,
    /// Layout file
    pub layout_path: PathBuf,
    /// Output directory override
    pub output_dir: Option<PathBuf>,
    /// Video encoder
    pub encoder: EncoderProfile,
}

impl JobSpec {
    /// Check the job before any work is done.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.audio_url.trim().is_empty() {
            return Err(JobError::MissingUrl("audio"));
        }
        if self.videos.is_empty() || self.videos.len() > MAX_VIDEO_TRACKS {
            return Err(JobError::VideoCount(self.videos.len()));
        }
        for track in &self.videos {
            if track.url.trim().is_empty() {
                return Err(JobError::MissingUrl("video"));
            }
            if !(track.speed > 0.0) || !track.speed.is_finite() {
                return Err(JobError::InvalidSpeed(track.speed));
            }
        }
        if self.requested_parts < 1 {
            return Err(JobError::InvalidPartCount(self.requested_parts));
        }
        Ok(())
    }
}

/// Parse the part-duration argument. Anything unparsable means "derive from part count".
pub fn parse_part_duration(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
