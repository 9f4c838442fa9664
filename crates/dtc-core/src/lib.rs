//! Core domain types for the DTC event pipeline.
//!
//! This crate provides the fundamental types shared across the pipeline:
//! - `TradeMode`: mutually exclusive operating contexts with total precedence
//! - `DtcEvent`: tagged union of typed broker event payloads
//! - DTC type-code constants for the JSON wire encoding
//! - Collaborator hook traits (`ErrorPolicy`, `HealthWatchdog`)

pub mod error;
pub mod event;
pub mod hooks;
pub mod mode;

pub use error::{CoreError, Result};
pub use event::{
    kind_for_discriminant, mode_for_account, AccountBalanceUpdate, DtcEvent, EventKind, Heartbeat,
    LogonResponse,
    MarketDataUpdateBidAsk, MarketDataUpdateTrade, OrderFillResponse, OrderUpdate, PositionUpdate,
    Reject, SecurityDefinitionResponse, TradeAccountResponse,
};
pub use hooks::{ErrorPolicy, HealthWatchdog};
pub use mode::TradeMode;
