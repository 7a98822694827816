//! Structured logging setup.
//!
//! Events go to stderr through `tracing-subscriber`. The filter comes from
//! `FORMGATE_LOG` (standard `EnvFilter` syntax) and falls back to a level picked
//! from the `-v` count.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

pub const LOG_ENV: &str = "FORMGATE_LOG";

pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
