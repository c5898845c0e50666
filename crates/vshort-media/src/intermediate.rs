//! Intermediate renders that prepare a video track for segmentation.
//!
//! These run without progress reporting, so the stats line is left off.

use std::path::Path;

use vshort_models::EncoderProfile;

use crate::command::FfmpegCommand;
use crate::filters::retime_filter;

/// Keep only the video stream of a muxed download, without re-encoding.
pub fn strip_audio_command(input: &Path, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(output)
        .without_stats()
        .copy_video()
        .no_audio();
    cmd.add_input(input);
    cmd
}

/// Re-render a video at `speed` (`setpts=PTS/speed`), video only.
pub fn retime_command(
    input: &Path,
    output: &Path,
    speed: f64,
    encoder: &EncoderProfile,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(output)
        .without_stats()
        .video_filter(retime_filter(speed))
        .no_audio()
        .output_args(encoder.intermediate_args());
    cmd.add_input(input);
    cmd
}

/// Loop a video `loops` times and cut it to exactly `target_secs`, video only.
pub fn loop_command(
    input: &Path,
    output: &Path,
    loops: u32,
    target_secs: f64,
    encoder: &EncoderProfile,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(output)
        .without_stats()
        .duration(target_secs)
        .no_audio()
        .output_args(encoder.intermediate_args());
    cmd.add_input_with_args(["-stream_loop".to_string(), loops.to_string()], input);
    cmd
}
