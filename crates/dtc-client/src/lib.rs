//! DTC broker event pipeline application.

pub mod app;
pub mod config;
pub mod consumers;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use consumers::LogConsumer;
pub use error::{AppError, AppResult};
