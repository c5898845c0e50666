//! Segment planning and duration arithmetic.
//!
//! Video tracks are retimed (`setpts=PTS/speed`) and loop-padded until they
//! cover the audio track; the audio duration then drives how the timeline is
//! cut into parts.

use thiserror::Error;

/// Durations closer than this are treated as equal.
pub const DURATION_TOLERANCE_SECS: f64 = 0.001;

/// Errors raised while computing a segment plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Part count must be at least 1 (got {0})")]
    InvalidPartCount(i64),

    #[error("Audio duration must be positive (got {0})")]
    UnknownAudioDuration(f64),
}

/// How the audio timeline is cut into parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPlan {
    /// Number of parts that will be rendered (>= 1)
    pub part_count: usize,
    /// Length of every part in seconds (> 0)
    pub part_duration: f64,
}

/// One part of the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentWindow {
    /// 0-based index
    pub index: usize,
    /// 1-based number shown to the user
    pub part_number: usize,
    /// Start offset in seconds
    pub start: f64,
    /// Length in seconds
    pub duration: f64,
}

impl SegmentPlan {
    /// Compute the plan.
    ///
    /// A non-positive `requested_part_duration` splits the audio evenly into
    /// `requested_parts`. Otherwise parts have the requested length and the
    /// count is capped by how many such parts fit the audio.
    pub fn compute(
        requested_parts: i64,
        requested_part_duration: f64,
        audio_duration: f64,
    ) -> Result<Self, PlanError> {
        if requested_parts < 1 {
            return Err(PlanError::InvalidPartCount(requested_parts));
        }
        if !(audio_duration > 0.0) {
            return Err(PlanError::UnknownAudioDuration(audio_duration));
        }

        let plan = if requested_part_duration <= 0.0 {
            Self {
                part_count: requested_parts as usize,
                part_duration: audio_duration / requested_parts as f64,
            }
        } else {
            let by_duration = (audio_duration / requested_part_duration).ceil() as i64;
            Self {
                part_count: requested_parts.min(by_duration) as usize,
                part_duration: requested_part_duration,
            }
        };

        Ok(plan)
    }

    /// The windows to render, in order.
    pub fn windows(&self) -> impl Iterator<Item = SegmentWindow> + '_ {
        (0..self.part_count).map(move |index| SegmentWindow {
            index,
            part_number: index + 1,
            start: index as f64 * self.part_duration,
            duration: self.part_duration,
        })
    }
}

/// Whether a speed multiplier requires a retime render.
pub fn needs_retime(speed: f64) -> bool {
    (speed - 1.0).abs() > f64::EPSILON
}

/// Effective duration after playing `natural_duration` at `speed`.
pub fn retimed_duration(natural_duration: f64, speed: f64) -> f64 {
    if needs_retime(speed) {
        natural_duration / speed
    } else {
        natural_duration
    }
}

/// How many loops are needed for a video to cover the audio.
///
/// Returns `None` when the video is already long enough.
pub fn loop_count(video_duration: f64, audio_duration: f64) -> Option<u32> {
    if video_duration <= 0.0 || video_duration >= audio_duration {
        return None;
    }
    Some((audio_duration / video_duration).ceil() as u32)
}

/// Whether a track of `video_duration` covers `audio_duration`.
pub fn covers(video_duration: f64, audio_duration: f64) -> bool {
    video_duration + DURATION_TOLERANCE_SECS >= audio_duration
}
