//! Command-line arguments.
//!
//! Both the single-video flags (`--video-url`, `--video-speed`) and the
//! numbered dual-video flags (`--video-url1`, `--video-url2`, ...) are
//! accepted so either caller contract keeps working.

use std::path::PathBuf;

use clap::Parser;

use vshort_models::encoding::DEFAULT_VIDEO_CODEC;
use vshort_models::job::parse_part_duration;
use vshort_models::{EncoderProfile, JobError, JobSpec, VideoTrack};

use crate::config::WorkerConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vshort",
    version,
    about = "Builds vertical short clips from a song, one or two videos and a layout"
)]
pub struct Cli {
    /// Directory with bundled tools and the `assets/` font folder
    #[arg(long, value_name = "DIR", env = "VSHORT_RESOURCES_PATH")]
    pub resources_path: PathBuf,

    /// Per-user data directory (scratch files, default output, cookies.txt)
    #[arg(long, value_name = "DIR", env = "VSHORT_USER_DATA_PATH")]
    pub user_data_path: PathBuf,

    /// URL supplying the audio track, thumbnail and output title
    #[arg(long, value_name = "URL", env = "VSHORT_AUDIO_URL")]
    pub audio_url: String,

    /// Video URL; repeat for a second video
    #[arg(long = "video-url", value_name = "URL")]
    pub video_urls: Vec<String>,

    /// Playback speed for each `--video-url`, in order
    #[arg(long = "video-speed", value_name = "SPEED")]
    pub video_speeds: Vec<f64>,

    /// First video URL (dual-video form)
    #[arg(long, value_name = "URL", env = "VSHORT_VIDEO_URL1", conflicts_with = "video_urls")]
    pub video_url1: Option<String>,

    /// Second video URL (dual-video form)
    #[arg(long, value_name = "URL", env = "VSHORT_VIDEO_URL2", requires = "video_url1")]
    pub video_url2: Option<String>,

    /// Playback speed of the first video (dual-video form)
    #[arg(long, value_name = "SPEED", env = "VSHORT_VIDEO_SPEED1", default_value_t = 1.0)]
    pub video_speed1: f64,

    /// Playback speed of the second video (dual-video form)
    #[arg(long, value_name = "SPEED", env = "VSHORT_VIDEO_SPEED2", default_value_t = 1.0)]
    pub video_speed2: f64,

    /// Layout JSON file
    #[arg(long, value_name = "FILE", env = "VSHORT_LAYOUT_FILE")]
    pub layout_file: PathBuf,

    /// Number of parts to render
    #[arg(long, env = "VSHORT_PARTS", default_value_t = 1, allow_negative_numbers = true)]
    pub parts: i64,

    /// Output directory (defaults to <user-data>/output)
    #[arg(long, value_name = "DIR", env = "VSHORT_SAVE_PATH", default_value = "")]
    pub save_path: String,

    /// Seconds per part; "0" splits the audio evenly into --parts
    #[arg(
        long,
        value_name = "SECONDS",
        env = "VSHORT_PART_DURATION",
        default_value = "0",
        allow_hyphen_values = true
    )]
    pub part_duration: String,

    /// Video encoder (libx264, h264_nvenc, h264_amf, h264_qsv, ...)
    #[arg(long, default_value = DEFAULT_VIDEO_CODEC, env = "VSHORT_ENCODER")]
    pub encoder: String,
}

/// Whether a parse error is a help or version request rather than a failure.
pub fn is_help_or_version(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
    )
}

impl Cli {
    /// Video tracks from whichever flag form was used.
    pub fn video_tracks(&self) -> Result<Vec<VideoTrack>, JobError> {
        match &self.video_url1 {
            Some(first) => {
                let mut urls = vec![first.clone()];
                let mut speeds = vec![self.video_speed1];
                if let Some(second) = &self.video_url2 {
                    urls.push(second.clone());
                    speeds.push(self.video_speed2);
                }
                VideoTrack::from_sources(&urls, &speeds)
            }
            None => VideoTrack::from_sources(&self.video_urls, &self.video_speeds),
        }
    }

    /// Job description for the pipeline.
    pub fn job(&self) -> Result<JobSpec, JobError> {
        let output_dir = Some(PathBuf::from(&self.save_path)).filter(|p| !p.as_os_str().is_empty());

        Ok(JobSpec {
            audio_url: self.audio_url.clone(),
            videos: self.video_tracks()?,
            requested_parts: self.parts,
            requested_part_duration: parse_part_duration(&self.part_duration),
            layout_path: self.layout_file.clone(),
            output_dir,
            encoder: EncoderProfile::from_name(self.encoder.clone()),
        })
    }

    /// Filesystem configuration for the run.
    pub fn worker_config(&self, job: &JobSpec) -> WorkerConfig {
        WorkerConfig::new(
            &self.resources_path,
            &self.user_data_path,
            job.output_dir.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &[&str] = &[
        "vshort",
        "--resources-path",
        "/res",
        "--user-data-path",
        "/data",
        "--audio-url",
        "https://youtube.com/watch?v=song",
        "--layout-file",
        "layout.json",
    ];

    fn parse(extra: &[&str]) -> Cli {
        let args: Vec<&str> = BASE.iter().chain(extra).copied().collect();
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_single_video_defaults() {
        let cli = parse(&["--video-url", "https://youtube.com/watch?v=clip"]);
        let job = cli.job().unwrap();

        assert_eq!(job.videos.len(), 1);
        assert_eq!(job.videos[0].placeholder_id, "video-placeholder");
        assert_eq!(job.videos[0].speed, 1.0);
        assert_eq!(job.requested_parts, 1);
        assert_eq!(job.requested_part_duration, 0.0);
        assert_eq!(job.output_dir, None);
        assert_eq!(job.encoder.encoder, "libx264");
    }

    #[test]
    fn test_repeated_video_flags() {
        let cli = parse(&[
            "--video-url",
            "a",
            "--video-speed",
            "1.5",
            "--video-url",
            "b",
            "--video-speed",
            "0.5",
            "--parts",
            "3",
            "--part-duration",
            "15",
            "--save-path",
            "/videos",
            "--encoder",
            "h264_nvenc",
        ]);
        let job = cli.job().unwrap();

        assert_eq!(job.videos[0].placeholder_id, "video-placeholder-1");
        assert_eq!(job.videos[1].speed, 0.5);
        assert_eq!(job.requested_parts, 3);
        assert_eq!(job.requested_part_duration, 15.0);
        assert_eq!(job.output_dir, Some(PathBuf::from("/videos")));
        assert!(job.encoder.family.is_hardware());
    }

    #[test]
    fn test_numbered_video_flags() {
        let cli = parse(&[
            "--video-url1",
            "a",
            "--video-url2",
            "b",
            "--video-speed2",
            "2.0",
        ]);
        let tracks = cli.video_tracks().unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].url, "a");
        assert_eq!(tracks[0].speed, 1.0);
        assert_eq!(tracks[1].speed, 2.0);
    }

    #[test]
    fn test_missing_video_is_a_job_error() {
        let cli = parse(&[]);
        assert_eq!(cli.job(), Err(JobError::VideoCount(0)));
    }

    #[test]
    fn test_unparsable_part_duration() {
        let cli = parse(&["--video-url", "a", "--part-duration", "abc"]);
        assert_eq!(cli.job().unwrap().requested_part_duration, 0.0);
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let err = Cli::try_parse_from(["vshort", "--help"]).unwrap_err();
        assert!(is_help_or_version(&err));

        let err = Cli::try_parse_from(["vshort", "--parts", "abc"]).unwrap_err();
        assert!(!is_help_or_version(&err));
    }

    #[test]
    fn test_worker_config() {
        let cli = parse(&["--video-url", "a"]);
        let config = cli.worker_config(&cli.job().unwrap());
        assert_eq!(config.output_dir, PathBuf::from("/data/output"));
        assert_eq!(config.resources_dir, PathBuf::from("/res"));
    }
}
