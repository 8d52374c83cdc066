//! `tracing` subscriber setup for the CLI and the daemon.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `locix=debug`
pub const LOG_ENV: &str = "LOCIX_LOG";

const DEFAULT_FILTER: &str = "locix=info";

/// Where log output goes
pub enum LogTarget<'a> {
    Stderr,
    /// Append to a file, used once the daemon has detached from the terminal
    File(&'a Path),
}

/// Install the global subscriber
///
/// The filter comes from `LOCIX_LOG`, then `configured`, then `locix=info`.
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_logging(configured: Option<&str>, verbose: bool, target: LogTarget<'_>) {
    let filter = build_filter(configured, verbose);

    match target {
        LogTarget::File(path) => {
            // A detached daemon has no terminal to fall back to
            if let Ok(file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .try_init();
            }
        }
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

fn build_filter(configured: Option<&str>, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }

    let directive = match (configured, verbose) {
        (_, true) => "locix=debug",
        (Some(configured), false) => configured,
        (None, false) => DEFAULT_FILTER,
    };

    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
