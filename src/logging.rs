use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::ConfigError;

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. Records go to stderr, stdout carries readings only.
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn setup_logging(verbose: bool) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .map_err(|e| ConfigError::LogFilter(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
