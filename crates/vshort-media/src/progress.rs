//! Progress parsing for ffmpeg stats lines and yt-dlp download lines.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `time=HH:MM:SS.ss` inside an ffmpeg stats line.
static STATS_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.(\d{2})").expect("valid stats regex")
});

/// `[download]  42.3% of ...` printed by yt-dlp with `--newline`.
static DOWNLOAD_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").expect("valid download regex")
});

/// Progress information from one ffmpeg stats line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Output time in milliseconds
    pub out_time_ms: i64,
}

impl FfmpegProgress {
    /// Parse the `time=` field of a stats line.
    pub fn from_stats_line(line: &str) -> Option<Self> {
        let caps = STATS_TIME.captures(line)?;
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());

        let hours = field(1)?;
        let minutes = field(2)?;
        let seconds = field(3)?;
        let centis = field(4)?;

        Some(Self {
            out_time_ms: ((hours * 60 + minutes) * 60 + seconds) * 1000 + centis * 10,
        })
    }

    /// Elapsed output time in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_ms as f64 / 1000.0
    }

    /// Calculate progress percentage given total duration in seconds.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if !(total_secs > 0.0) {
            return 0.0;
        }
        ((self.out_time_secs() / total_secs) * 100.0).min(100.0)
    }
}

/// Parse a yt-dlp download progress line into a percentage.
pub fn parse_download_percent(line: &str) -> Option<f64> {
    DOWNLOAD_PERCENT
        .captures(line.trim_start())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
