//! Vertical short-clip builder.
//!
//! This crate provides:
//! - Command-line arguments and worker configuration
//! - The clip pipeline (fetch, normalize, segment, render)
//! - The stdout line protocol sink
//! - Tracing setup

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod reporter;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use vshort_media::{usable_cookies, FfmpegToolkit, ToolPaths, YtDlpFetcher};
use vshort_models::EventSink;

pub use cli::Cli;
pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{remove_scratch, report_failure, Pipeline, PreparedTrack};
pub use reporter::StdioSink;

/// Run one job described by the command line.
///
/// Tools are resolved before any network activity. Failures are reported on
/// `sink` before they are returned, and the scratch directory is removed
/// even when the job never starts.
pub async fn run(cli: &Cli, sink: Arc<dyn EventSink>) -> PipelineResult<Vec<PathBuf>> {
    let prepared = cli.job().map_err(PipelineError::from).and_then(|job| {
        let config = cli.worker_config(&job);
        let tools = ToolPaths::resolve(Some(config.resources_dir.as_path()))?;
        Ok((job, config, tools))
    });
    let (job, config, tools) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            report_failure(sink.as_ref(), &e);
            let config = WorkerConfig::new(&cli.resources_path, &cli.user_data_path, None);
            remove_scratch(sink.as_ref(), &config.scratch_dir).await;
            return Err(e);
        }
    };
    debug!(?tools, "Resolved tools");

    let cookies = usable_cookies(&config.cookies_path).await;
    let fetcher = YtDlpFetcher::new(&tools.yt_dlp, Arc::clone(&sink))
        .with_ffmpeg_dir(tools.ffmpeg_dir().map(|dir| dir.to_path_buf()))
        .with_cookies(cookies);
    let toolkit = FfmpegToolkit::new(&tools.ffmpeg, &tools.ffprobe, Arc::clone(&sink));

    Pipeline::new(config, Arc::new(fetcher), Arc::new(toolkit), sink)
        .run(&job)
        .await
}
