//! # Telemetry: tracing subscriber setup

use crate::config::{LogConfig, LogFormat};
use crate::error::{CoreError, CoreResult};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// Events go to stderr. `RUST_LOG` wins over the configured level when set.
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> CoreResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CoreError::Config(format!("invalid log level {:?}: {e}", config.level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| CoreError::Config(e.to_string()))
}
