//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] dtc_transport::TransportError),

    #[error("Router error: {0}")]
    Router(#[from] dtc_router::RouterError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dtc_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown requested")]
    Shutdown,
}

pub type AppResult<T> = Result<T, AppError>;
