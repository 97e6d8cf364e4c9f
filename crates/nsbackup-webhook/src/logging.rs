//! Logging setup
//!
//! `LOG_LEVEL` accepts a plain level (`info`) or full filter directives
//! (`info,kube=warn`). `LOG_FORMAT=json` switches to one JSON object per line.
//! Logs go to stderr so command output on stdout stays clean.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Build the filter for a level or directive string
pub fn filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| CliError::Config {
        message: format!("invalid log level '{}': {}", level, e),
        help: Some("use one of trace, debug, info, warn, error".to_string()),
    })
}

/// Install the global subscriber
pub fn init(level: &str, format: LogFormat) -> Result<()> {
    let filter = filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
    };

    result.map_err(|e| CliError::config(format!("failed to initialize logging: {}", e)))
}
