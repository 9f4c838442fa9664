//! Telemetry for the DTC pipeline: logging setup and log-backed health
//! reporting hooks.

pub mod error;
pub mod health;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use health::{BeatWatchdog, LoggingErrorPolicy};
pub use logging::{init_logging, LogFormat};
