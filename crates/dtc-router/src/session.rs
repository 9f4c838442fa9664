//! Session state.
//!
//! Single source of truth for the pipeline's current mode, account,
//! per-mode balances, and open positions. Owned by the router behind one
//! mutex; everything here is synchronous and allocation-light.

use chrono::{DateTime, Utc};
use dtc_core::TradeMode;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One open position keyed by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub account: String,
    pub mode: TradeMode,
    pub updated_at: DateTime<Utc>,
}

/// Read-only copy of the session for UI surfaces.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: TradeMode,
    pub account: String,
    pub balances: HashMap<TradeMode, Decimal>,
    pub positions: Vec<OpenPosition>,
}

/// Mutable session state.
#[derive(Debug)]
pub struct SessionState {
    mode: TradeMode,
    account: String,
    balances: HashMap<TradeMode, Decimal>,
    positions: HashMap<String, OpenPosition>,
}

impl SessionState {
    /// Sessions start in DEBUG with no account until the feed proves
    /// otherwise.
    pub fn new() -> Self {
        Self {
            mode: TradeMode::Debug,
            account: String::new(),
            balances: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn mode(&self) -> TradeMode {
        self.mode
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Commit a mode switch together with the account that drove it.
    pub fn set_mode(&mut self, mode: TradeMode, account: &str) {
        self.mode = mode;
        self.account = account.to_string();
    }

    /// Update the account without changing mode (trade account discovery).
    pub fn set_account(&mut self, account: &str) {
        self.account = account.to_string();
    }

    /// Store a balance in its mode slot.
    pub fn record_balance(&mut self, mode: TradeMode, balance: Decimal) {
        self.balances.insert(mode, balance);
    }

    pub fn balance_for(&self, mode: TradeMode) -> Option<Decimal> {
        self.balances.get(&mode).copied()
    }

    /// Insert or replace an open position.
    pub fn upsert_position(&mut self, position: OpenPosition) {
        self.positions.insert(position.symbol.clone(), position);
    }

    /// Remove a position. Idempotent: removing an absent symbol is a no-op.
    /// Returns true when a position was actually removed.
    pub fn clear_position(&mut self, symbol: &str) -> bool {
        self.positions.remove(symbol).is_some()
    }

    pub fn position(&self, symbol: &str) -> Option<&OpenPosition> {
        self.positions.get(symbol)
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    /// Precedence gate: a switch into `candidate` is blocked while any
    /// open position belongs to a mode that outranks it. Returns the
    /// blocking mode.
    pub fn blocked_by_open_position(&self, candidate: TradeMode) -> Option<TradeMode> {
        self.positions
            .values()
            .map(|p| p.mode)
            .filter(|m| m.outranks(candidate))
            .max_by_key(|m| m.precedence())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            account: self.account.clone(),
            balances: self.balances.clone(),
            positions: self.positions.values().cloned().collect(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
