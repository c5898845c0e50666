//! Media fetching with yt-dlp.
//!
//! The pipeline only sees the [`MediaFetcher`] trait: resolve a URL to
//! metadata, download an audio-only file, a muxed video file or a thumbnail.
//! [`YtDlpFetcher`] implements it with the yt-dlp CLI and reqwest.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use vshort_models::encoding::{
    DOWNLOAD_AUDIO_FORMAT, DOWNLOAD_AUDIO_QUALITY, DOWNLOAD_VIDEO_CONTAINER,
};
use vshort_models::{EventSink, PipelineEvent};

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{find_with_stem, move_file};
use crate::runner::{capture, ProcessRunner, ProgressMode};

/// Minimum size for a valid cookies file (bytes).
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// Parallel fragment downloads for video.
const VIDEO_CONCURRENT_FRAGMENTS: u32 = 10;

const AUDIO_FORMAT_SELECTOR: &str = "bestaudio/best";
const VIDEO_FORMAT_SELECTOR: &str = "bestvideo+bestaudio/best";

/// What yt-dlp reports about a URL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl VideoMetadata {
    /// Title, falling back to the id when the platform gave none.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// Source of remote media.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Resolve a URL without downloading anything.
    async fn fetch_metadata(&self, url: &str) -> MediaResult<VideoMetadata>;

    /// Download the audio track, re-encoded to MP3, to `dest`.
    async fn download_audio(&self, url: &str, dest: &Path) -> MediaResult<()>;

    /// Download a muxed video+audio file to `dest`.
    async fn download_video(&self, url: &str, dest: &Path) -> MediaResult<()>;

    /// Download a thumbnail image to `dest`.
    async fn download_thumbnail(&self, thumbnail_url: &str, dest: &Path) -> MediaResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DownloadKind {
    Audio,
    Video,
}

impl DownloadKind {
    fn extension(self) -> &'static str {
        match self {
            Self::Audio => DOWNLOAD_AUDIO_FORMAT,
            Self::Video => DOWNLOAD_VIDEO_CONTAINER,
        }
    }
}

/// [`MediaFetcher`] backed by the yt-dlp CLI.
pub struct YtDlpFetcher {
    yt_dlp: PathBuf,
    /// Directory holding the ffmpeg yt-dlp should merge and extract with
    ffmpeg_dir: Option<PathBuf>,
    cookies: Option<PathBuf>,
    sink: Arc<dyn EventSink>,
    runner: ProcessRunner,
    http: Client,
}

impl YtDlpFetcher {
    pub fn new(yt_dlp: impl AsRef<Path>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            yt_dlp: yt_dlp.as_ref().to_path_buf(),
            ffmpeg_dir: None,
            cookies: None,
            runner: ProcessRunner::new(Arc::clone(&sink)).without_error_echo(),
            sink,
            http: Client::new(),
        }
    }

    pub fn with_ffmpeg_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.ffmpeg_dir = dir;
        self
    }

    /// Use a Netscape cookie jar for authenticated requests.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec!["--no-playlist".to_string(), "--no-warnings".to_string()];
        if let Some(cookies) = &self.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }
        args
    }

    fn download_args(&self, kind: DownloadKind, url: &str, stem: &Path) -> Vec<String> {
        let mut args = self.common_args();
        args.push("--newline".to_string());

        match kind {
            DownloadKind::Audio => args.extend(
                [
                    "-f",
                    AUDIO_FORMAT_SELECTOR,
                    "-x",
                    "--audio-format",
                    DOWNLOAD_AUDIO_FORMAT,
                    "--audio-quality",
                    DOWNLOAD_AUDIO_QUALITY,
                ]
                .map(String::from),
            ),
            DownloadKind::Video => {
                args.extend(
                    [
                        "-f",
                        VIDEO_FORMAT_SELECTOR,
                        "--merge-output-format",
                        DOWNLOAD_VIDEO_CONTAINER,
                        "--concurrent-fragments",
                    ]
                    .map(String::from),
                );
                args.push(VIDEO_CONCURRENT_FRAGMENTS.to_string());
            }
        }

        if let Some(dir) = &self.ffmpeg_dir {
            args.push("--ffmpeg-location".to_string());
            args.push(dir.to_string_lossy().to_string());
        }

        args.push("-o".to_string());
        args.push(format!("{}.%(ext)s", stem.to_string_lossy()));
        args.push(url.to_string());
        args
    }

    async fn download(&self, kind: DownloadKind, url: &str, dest: &Path) -> MediaResult<()> {
        let stem = dest.with_extension("");
        let cmd = ToolCommand::new(&self.yt_dlp).args(self.download_args(kind, url, &stem));

        info!(url = %url, dest = %dest.display(), kind = ?kind, "Downloading");

        self.runner
            .execute(&cmd, ProgressMode::Download)
            .await
            .map_err(classify_failure)?;

        // yt-dlp picks the extension; put the result where the caller asked
        let produced = find_with_stem(&stem, kind.extension())
            .await?
            .ok_or_else(|| MediaError::download_failed("Output file not created"))?;
        move_file(&produced, dest).await?;

        self.sink.emit(PipelineEvent::DownloadProgress(100.0));
        debug!(dest = %dest.display(), "Download finished");
        Ok(())
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_metadata(&self, url: &str) -> MediaResult<VideoMetadata> {
        let cmd = ToolCommand::new(&self.yt_dlp)
            .arg("--dump-single-json")
            .args(self.common_args())
            .arg(url);

        let output = capture(&cmd).await?;
        if !output.success {
            debug!("yt-dlp stderr: {}", output.stderr);
            return Err(classify_stderr(&output.stderr));
        }

        let metadata: VideoMetadata = serde_json::from_str(&output.stdout)?;
        debug!(id = %metadata.id, title = %metadata.title, "Fetched metadata");
        Ok(metadata)
    }

    async fn download_audio(&self, url: &str, dest: &Path) -> MediaResult<()> {
        self.download(DownloadKind::Audio, url, dest).await
    }

    async fn download_video(&self, url: &str, dest: &Path) -> MediaResult<()> {
        self.download(DownloadKind::Video, url, dest).await
    }

    async fn download_thumbnail(&self, thumbnail_url: &str, dest: &Path) -> MediaResult<()> {
        let response = self.http.get(thumbnail_url).send().await?;

        if !response.status().is_success() {
            return Err(MediaError::download_failed(format!(
                "Thumbnail request returned {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;

        if !dest.exists() {
            return Err(MediaError::FileNotFound(dest.to_path_buf()));
        }
        Ok(())
    }
}

/// Turn a failed yt-dlp run into a fetch error.
fn classify_failure(err: MediaError) -> MediaError {
    match err {
        MediaError::ToolFailed { stderr_tail, .. } => classify_stderr(&stderr_tail),
        other => other,
    }
}

fn classify_stderr(stderr: &str) -> MediaError {
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last())
        .unwrap_or("Unknown error")
        .to_string();

    if stderr.contains("HTTP Error 403") {
        MediaError::auth_required(message)
    } else {
        MediaError::download_failed(message)
    }
}

/// Validate that a cookies file appears to be in Netscape format.
///
/// Netscape cookies files either start with "# Netscape HTTP Cookie File"
/// or contain tab-separated lines with domain entries.
fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File")
        || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.split('\t').count() >= 6)
}

/// Return `path` if it holds a usable cookie jar.
///
/// Missing, tiny or malformed files are ignored.
pub async fn usable_cookies(path: &Path) -> Option<PathBuf> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => {
            debug!("Cookies file not found at {}, skipping", path.display());
            return None;
        }
    };

    if metadata.len() < MIN_COOKIES_FILE_SIZE {
        debug!(
            "Cookies file {} is too small ({} bytes), skipping",
            path.display(),
            metadata.len()
        );
        return None;
    }

    match tokio::fs::read_to_string(path).await {
        Ok(content) if is_valid_netscape_cookies(&content) => {
            info!("Using cookies file {}", path.display());
            Some(path.to_path_buf())
        }
        Ok(_) => {
            debug!(
                "Cookies file {} is not in Netscape format, skipping",
                path.display()
            );
            None
        }
        Err(e) => {
            warn!("Failed to read cookies file: {}", e);
            None
        }
    }
}
