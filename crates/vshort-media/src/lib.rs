//! FFmpeg and yt-dlp CLI wrappers for clip building.
//!
//! This crate provides:
//! - FFmpeg command building with stable input handles
//! - A process runner that streams both output channels and parses progress
//! - Duration probing with ffprobe
//! - Layout to filter-graph compilation
//! - Media fetching with yt-dlp
//! - Tool discovery and filesystem helpers

pub mod command;
pub mod download;
pub mod error;
pub mod escape;
pub mod filters;
pub mod fs_utils;
pub mod inline_image;
pub mod intermediate;
pub mod probe;
pub mod progress;
pub mod runner;
pub mod toolkit;
pub mod tools;

pub use command::{FfmpegCommand, InputHandle, ToolCommand};
pub use download::{usable_cookies, MediaFetcher, VideoMetadata, YtDlpFetcher};
pub use error::{MediaError, MediaResult};
pub use filters::{compile_layout, FilterGraph};
pub use probe::probe_duration;
pub use progress::FfmpegProgress;
pub use runner::{ProcessRunner, ProgressMode};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use tools::ToolPaths;
