//! Logging initialization.
//!
//! Logs always go to stderr; stdout carries report records.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` takes precedence over the level chosen here.
pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section, with CLI overrides.
pub fn init_from_config(
    config: &specimen_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (verbose, json_format) = resolve(config, verbose_override, json_logs_override);
    init(verbose, json_format);
}

fn resolve(config: &specimen_core::Config, verbose: bool, json_logs: bool) -> (bool, bool) {
    let verbose = verbose || matches!(config.logging.level.as_str(), "debug" | "trace");
    let json_format = json_logs || config.logging.format == "json";
    (verbose, json_format)
}
