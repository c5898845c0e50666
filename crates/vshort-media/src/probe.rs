//! FFprobe duration probing.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::command::ToolCommand;
use crate::runner::capture;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Build the ffprobe invocation for a file's container duration.
pub fn duration_command(ffprobe: impl AsRef<Path>, path: impl AsRef<Path>) -> ToolCommand {
    ToolCommand::new(ffprobe).args([
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        path.as_ref().to_string_lossy().to_string(),
    ])
}

/// Get a media file's duration in seconds.
///
/// Never fails: a missing file, a failed ffprobe run or unparsable output all
/// yield `0.0`, which callers treat as "unknown".
pub async fn probe_duration(ffprobe: impl AsRef<Path>, path: impl AsRef<Path>) -> f64 {
    let path = path.as_ref();

    if !path.exists() {
        warn!(path = %path.display(), "Cannot probe missing file");
        return 0.0;
    }

    let output = match capture(&duration_command(ffprobe, path)).await {
        Ok(output) => output,
        Err(e) => {
            warn!(path = %path.display(), "ffprobe could not run: {}", e);
            return 0.0;
        }
    };

    if !output.success {
        warn!(
            path = %path.display(),
            exit_code = ?output.exit_code,
            "ffprobe failed: {}",
            output.stderr.trim()
        );
        return 0.0;
    }

    match parse_duration_output(&output.stdout) {
        Some(duration) => {
            debug!(path = %path.display(), duration_secs = duration, "Probed duration");
            duration
        }
        None => {
            warn!(path = %path.display(), "ffprobe reported no duration");
            0.0
        }
    }
}

/// Extract `format.duration` from ffprobe's JSON output.
fn parse_duration_output(stdout: &str) -> Option<f64> {
    let probe: FfprobeOutput = serde_json::from_str(stdout).ok()?;
    probe
        .format?
        .duration?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}
