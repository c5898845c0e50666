//! Writes pipeline events to the standard streams.

use std::io::Write;

use vshort_models::{EventSink, OutputChannel, PipelineEvent};

/// Prints each event as one protocol line and flushes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioSink;

impl EventSink for StdioSink {
    fn emit(&self, event: PipelineEvent) {
        let line = event.to_line();
        // Broken pipes are ignored
        let _ = match event.channel() {
            OutputChannel::Stdout => write_line(&mut std::io::stdout().lock(), &line),
            OutputChannel::Stderr => write_line(&mut std::io::stderr().lock(), &line),
        };
    }
}

fn write_line(out: &mut impl Write, line: &str) -> std::io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}
