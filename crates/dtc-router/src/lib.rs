//! Event routing for the DTC pipeline.
//!
//! The router owns session state (mode, account, balances, positions) and
//! pushes every inbound frame through one pipeline: classify, evaluate a
//! debounced mode switch, apply validity filters, update state, dispatch
//! to consumers exactly once each, and coalesce UI refreshes.

pub mod classifier;
pub mod consumer;
pub mod detector;
pub mod error;
pub mod refresh;
pub mod router;
pub mod session;

pub use classifier::classify;
pub use consumer::{DispatchFailure, DispatchReport, EventConsumer};
pub use detector::ModeDetector;
pub use error::{RouterError, RouterResult};
pub use refresh::{RefreshScheduler, DEFAULT_REFRESH_INTERVAL};
pub use router::{MessageRouter, RawFrameHook, RouterConfig};
pub use session::{OpenPosition, SessionSnapshot, SessionState};
