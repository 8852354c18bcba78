//! # Logging
//!
//! `tracing-subscriber` setup. The filter comes from `RUST_LOG` and defaults to
//! `grafana_operator=info`; the output format follows `LOG_FORMAT`.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "grafana_operator=info";

/// Install the global tracing subscriber
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}
