//! Logging setup for the CLI.
//!
//! stdout is reserved for command payloads (output paths, JSON reports);
//! all log output goes to stderr. `RUST_LOG` overrides the verbosity flags
//! when set.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Call once at startup.
pub fn init_logging(verbose: u8, quiet: bool, no_color: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}
