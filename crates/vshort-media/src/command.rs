//! FFmpeg command builder.
//!
//! Inputs are declared through [`FfmpegCommand::add_input`], which hands back
//! an [`InputHandle`]. Positional `-i` indices only appear when the command is
//! serialized, so callers never count inputs by hand.

use std::fmt;
use std::path::{Path, PathBuf};

/// Stable reference to a declared input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputHandle(usize);

impl InputHandle {
    /// Positional index of this input on the ffmpeg command line.
    pub fn index(self) -> usize {
        self.0
    }

    /// Stream specifier for this input's video, e.g. `[2:v]`.
    pub fn video_pad(self) -> String {
        format!("[{}:v]", self.0)
    }

    /// Stream specifier for this input's audio, e.g. `[3:a]`.
    pub fn audio_pad(self) -> String {
        format!("[{}:a]", self.0)
    }
}

impl fmt::Display for InputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Input {
    /// Arguments placed before this input's `-i`
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Keep the periodic `time=` stats line on stderr
    stats: bool,
}

impl FfmpegCommand {
    /// Create a command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            stats: true,
        }
    }

    /// Declare an input file.
    pub fn add_input(&mut self, path: impl AsRef<Path>) -> InputHandle {
        self.add_input_with_args(Vec::<String>::new(), path)
    }

    /// Declare an input file with per-input options such as `-stream_loop`.
    pub fn add_input_with_args<I, S>(&mut self, args: I, path: impl AsRef<Path>) -> InputHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(Input {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        InputHandle(self.inputs.len() - 1)
    }

    /// Number of declared inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Path of a declared input.
    pub fn input_path(&self, handle: InputHandle) -> Option<&Path> {
        self.inputs.get(handle.0).map(|input| input.path.as_path())
    }

    /// Output file path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a simple video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter:v").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter pad into the output.
    pub fn map(self, pad: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(pad)
    }

    /// Cap the output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(seconds.to_string())
    }

    /// Drop all audio streams.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Copy the video stream without re-encoding.
    pub fn copy_video(self) -> Self {
        self.output_arg("-c:v").output_arg("copy")
    }

    /// Suppress the stats line.
    pub fn without_stats(mut self) -> Self {
        self.stats = false;
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-loglevel".to_string());
        args.push("error".to_string());

        // Progress comes from the `time=` field of the stats line
        if self.stats {
            args.push("-stats".to_string());
        }

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Bind the command to an ffmpeg binary.
    pub fn to_tool_command(&self, ffmpeg: impl AsRef<Path>) -> ToolCommand {
        ToolCommand::new(ffmpeg).args(self.build_args())
    }
}

/// A fully resolved external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Program file name, used in logs and errors.
    pub fn program_name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Shell-like rendering for debug logs.
    pub fn display(&self) -> String {
        let mut out = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(' ') {
                out.push('"');
                out.push_str(arg);
                out.push('"');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}
