//! Shared `tracing` setup for the nodecheck binaries.
//!
//! Logs go to stderr so stdout stays reserved for the report.

use std::env::var;
use std::io;

use tracing::warn;
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::level_filters::LevelFilter;

pub fn init() {
    init_with_level(LevelFilter::WARN);
}

/// Initialize the subscriber with `level` as the default directive.
///
/// `RUST_LOG` overrides the level, `RUST_LOG_FORMAT=json` switches to JSON
/// lines. Calling this twice is harmless; the first subscriber stays.
pub fn init_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT").unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_filter(env_filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_writer(io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("Tracing already initialized: {error}");
    }
}

/// Default level for a `-v` count: warn, then info, debug, trace
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
