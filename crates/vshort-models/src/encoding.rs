//! Video encoding configuration.
//!
//! The encoder name passed on the command line selects one of four argument
//! profiles. Hardware encoders are detected by substring so that names like
//! `h264_nvenc` or `hevc_qsv` pick the right profile.

use serde::{Deserialize, Serialize};

/// Software encoder used when no hardware profile matches.
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Software encoder preset.
pub const DEFAULT_PRESET: &str = "veryfast";
/// Quality target shared by every profile.
pub const DEFAULT_QUALITY: u8 = 23;
/// Thread count for retime/loop renders on the software encoder.
pub const INTERMEDIATE_THREADS: usize = 4;
/// Upper bound on software encoder threads for segment renders.
pub const MAX_SEGMENT_THREADS: usize = 6;

/// Audio codec of rendered segments.
pub const SEGMENT_AUDIO_CODEC: &str = "aac";
/// Audio bitrate of rendered segments.
pub const SEGMENT_AUDIO_BITRATE: &str = "192k";
/// Output frame rate of rendered segments.
pub const OUTPUT_FRAME_RATE: u32 = 30;

/// Codec the audio source is extracted to.
pub const DOWNLOAD_AUDIO_FORMAT: &str = "mp3";
/// Bitrate the audio source is extracted at.
pub const DOWNLOAD_AUDIO_QUALITY: &str = "192K";
/// Container the video source is merged into.
pub const DOWNLOAD_VIDEO_CONTAINER: &str = "mp4";

/// Encoder family, derived from the encoder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderFamily {
    /// NVIDIA NVENC
    Nvenc,
    /// AMD AMF
    Amf,
    /// Intel Quick Sync
    Qsv,
    /// CPU (libx264)
    Software,
}

impl EncoderFamily {
    /// Classify an encoder name.
    pub fn detect(encoder: &str) -> Self {
        if encoder.contains("nvenc") {
            Self::Nvenc
        } else if encoder.contains("amf") {
            Self::Amf
        } else if encoder.contains("qsv") {
            Self::Qsv
        } else {
            Self::Software
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::Software)
    }
}

/// Encoder selection plus the argument sets derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderProfile {
    /// Encoder name as requested by the caller
    pub encoder: String,
    /// Detected family
    pub family: EncoderFamily,
}

impl Default for EncoderProfile {
    fn default() -> Self {
        Self::from_name(DEFAULT_VIDEO_CODEC)
    }
}

impl EncoderProfile {
    /// Create a profile from an encoder name.
    pub fn from_name(encoder: impl Into<String>) -> Self {
        let encoder = encoder.into();
        let family = EncoderFamily::detect(&encoder);
        Self { encoder, family }
    }

    /// Video codec arguments without any thread setting.
    pub fn video_codec_args(&self) -> Vec<String> {
        let q = DEFAULT_QUALITY.to_string();
        let encoder = self.encoder.as_str();
        let args: Vec<&str> = match self.family {
            EncoderFamily::Nvenc => {
                vec!["-c:v", encoder, "-preset", "p5", "-cq", q.as_str(), "-b:v", "0"]
            }
            EncoderFamily::Amf => vec!["-c:v", encoder, "-quality", "balanced", "-qp", q.as_str()],
            EncoderFamily::Qsv => {
                vec!["-c:v", encoder, "-preset", "medium", "-global_quality", q.as_str()]
            }
            EncoderFamily::Software => {
                vec!["-c:v", DEFAULT_VIDEO_CODEC, "-preset", DEFAULT_PRESET, "-crf", q.as_str()]
            }
        };
        args.into_iter().map(String::from).collect()
    }

    /// Arguments for retime and loop renders.
    pub fn intermediate_args(&self) -> Vec<String> {
        let mut args = self.video_codec_args();
        if !self.family.is_hardware() {
            args.extend(["-threads".to_string(), INTERMEDIATE_THREADS.to_string()]);
        }
        args
    }

    /// Arguments for segment renders.
    ///
    /// Hardware encoders get a single CPU thread. The software encoder uses
    /// one thread less than the core count, capped at six.
    pub fn segment_args(&self, cpu_count: usize) -> Vec<String> {
        let mut args = self.video_codec_args();
        let threads = if self.family.is_hardware() {
            1
        } else {
            segment_threads(cpu_count)
        };
        args.extend(["-threads".to_string(), threads.to_string()]);
        args
    }

    /// Fixed audio and timing arguments appended to every segment render.
    pub fn segment_output_args() -> Vec<String> {
        vec![
            "-c:a".to_string(),
            SEGMENT_AUDIO_CODEC.to_string(),
            "-b:a".to_string(),
            SEGMENT_AUDIO_BITRATE.to_string(),
            "-r".to_string(),
            OUTPUT_FRAME_RATE.to_string(),
            "-shortest".to_string(),
        ]
    }
}

fn segment_threads(cpu_count: usize) -> usize {
    cpu_count.saturating_sub(1).clamp(1, MAX_SEGMENT_THREADS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_detection() {
        assert_eq!(EncoderFamily::detect("h264_nvenc"), EncoderFamily::Nvenc);
        assert_eq!(EncoderFamily::detect("hevc_amf"), EncoderFamily::Amf);
        assert_eq!(EncoderFamily::detect("h264_qsv"), EncoderFamily::Qsv);
        assert_eq!(EncoderFamily::detect("libx264"), EncoderFamily::Software);
        assert_eq!(EncoderFamily::detect("libx265"), EncoderFamily::Software);
    }

    #[test]
    fn test_nvenc_args() {
        let profile = EncoderProfile::from_name("h264_nvenc");
        assert_eq!(
            profile.segment_args(16),
            vec!["-c:v", "h264_nvenc", "-preset", "p5", "-cq", "23", "-b:v", "0", "-threads", "1"]
        );
        assert!(!profile.intermediate_args().contains(&"-threads".to_string()));
    }

    #[test]
    fn test_software_falls_back_to_libx264() {
        let profile = EncoderProfile::from_name("mpeg4");
        let args = profile.intermediate_args();
        assert_eq!(
            args,
            vec!["-c:v", "libx264", "-preset", "veryfast", "-crf", "23", "-threads", "4"]
        );
    }

    #[test]
    fn test_segment_threads() {
        assert_eq!(segment_threads(1), 1);
        assert_eq!(segment_threads(4), 3);
        assert_eq!(segment_threads(32), 6);
    }

    #[test]
    fn test_segment_output_args() {
        let args = EncoderProfile::segment_output_args();
        assert_eq!(
            args,
            vec!["-c:a", "aac", "-b:a", "192k", "-r", "30", "-shortest"]
        );
    }
}
