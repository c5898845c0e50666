//! Tracing setup.
//!
//! Diagnostics go to stderr. stdout carries the line protocol and nothing
//! else, so the subscriber must never write there.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter applied when `RUST_LOG` is not set. Matches every `vshort*` target.
pub const DEFAULT_FILTER: &str = "vshort=warn";

/// Install the global subscriber.
///
/// `LOG_FORMAT=json` switches to JSON lines; otherwise output is plain text,
/// colored only when stderr is a terminal.
pub fn init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    }
}
