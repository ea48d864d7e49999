//! Tracing setup for the CLI and embedding hosts.
//!
//! `RUST_LOG` wins over the configured level. The HTTP client stack is kept
//! at `warn` unless a directive says otherwise, so per-request chatter from
//! hyper never drowns the wallet's own transitions.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

const QUIET_DEPENDENCIES: [&str; 3] = ["hyper=warn", "hyper_util=warn", "reqwest=warn"];

fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

/// Base level, then the dependency defaults, then the configured directives,
/// so a configured `reqwest=debug` still takes effect.
fn filter_directives(config: &LoggingConfig) -> String {
    std::iter::once(config.log_level.as_str())
        .chain(QUIET_DEPENDENCIES)
        .chain(config.directives.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let appender = RollingFileAppender::new(
        rotation(&config.rotation),
        &config.log_dir,
        &config.log_file,
    );
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        // stdout belongs to CLI output; console logs go to stderr
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    guard
}
