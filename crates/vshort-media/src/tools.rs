//! External tool discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Resolved locations of the external binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub yt_dlp: PathBuf,
}

impl ToolPaths {
    /// Resolve every tool, preferring copies bundled in `resources_dir`.
    ///
    /// Fails with the matching "not found" error for the first tool that
    /// cannot be located.
    pub fn resolve(resources_dir: Option<&Path>) -> MediaResult<Self> {
        Ok(Self {
            ffmpeg: locate("ffmpeg", resources_dir).ok_or(MediaError::FfmpegNotFound)?,
            ffprobe: locate("ffprobe", resources_dir).ok_or(MediaError::FfprobeNotFound)?,
            yt_dlp: locate("yt-dlp", resources_dir).ok_or(MediaError::YtDlpNotFound)?,
        })
    }

    /// Directory containing ffmpeg, handed to yt-dlp for merging.
    pub fn ffmpeg_dir(&self) -> Option<&Path> {
        self.ffmpeg.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Platform file name of an executable.
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Find `name` in `resources_dir`, then on `PATH`.
pub fn locate(name: &str, resources_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = resources_dir {
        let bundled = dir.join(executable_name(name));
        if bundled.is_file() {
            debug!(tool = name, path = %bundled.display(), "Using bundled tool");
            return Some(bundled);
        }
    }

    match which::which(name) {
        Ok(path) => {
            debug!(tool = name, path = %path.display(), "Using tool from PATH");
            Some(path)
        }
        Err(_) => None,
    }
}
