//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty output for development terminals.
    #[default]
    Pretty,
    /// JSON lines for production log shipping.
    Json,
}

impl LogFormat {
    /// Pick the format from `RUST_ENV` ("production" means JSON).
    pub fn from_env() -> Self {
        match std::env::var("RUST_ENV") {
            Ok(v) if v == "production" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initialize structured logging for the whole process.
///
/// `default_filter` applies when `RUST_LOG` is unset; pass `None` for the
/// pipeline default. Fails if a global subscriber is already installed.
pub fn init_logging(format: LogFormat, default_filter: Option<&str>) -> TelemetryResult<()> {
    let filter = default_filter.unwrap_or("info,dtc=debug");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::InitFailed(e.to_string()))
}
