//! Log subscriber setup.
//!
//! JSON lines by default, for log aggregation. `LOG_FORMAT=compact` gives
//! single-line human output for local runs.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{
    filter::{Directive, ParseError},
    fmt,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// HTTP client internals that drown out the bridge at `debug`. Applied
/// unless the filter names the target itself.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("expected \"json\" or \"compact\", got {other:?}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("Failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Parse `filter` and cap the noisy dependency targets at `warn`.
pub fn build_filter(filter: &str) -> Result<EnvFilter, ParseError> {
    let mut env_filter = EnvFilter::try_new(filter)?;
    for target in QUIET_TARGETS {
        let named = filter
            .split(',')
            .any(|d| d.trim().split(['=', '[']).next() == Some(*target));
        if !named {
            env_filter = env_filter.add_directive(format!("{target}=warn").parse::<Directive>()?);
        }
    }
    Ok(env_filter)
}

/// Install the global subscriber.
pub fn init_logging(filter: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter_layer = build_filter(filter)?;
    let registry = tracing_subscriber::registry();

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .flatten_event(true),
            )
            .with(filter_layer)
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .with(filter_layer)
            .try_init()?,
    }

    tracing::info!(filter = %filter, log_format = ?format, "Logging initialized");
    Ok(())
}
