//! Consumer dispatch surface.
//!
//! Consumers receive typed callbacks for routed events. Every hook has a
//! no-op default so a consumer implements only what it cares about. Hooks
//! are synchronous and must be fast; slow work belongs on a channel behind
//! the consumer.

use crate::error::RouterResult;
use dtc_core::{
    AccountBalanceUpdate, Heartbeat, LogonResponse, MarketDataUpdateBidAsk, MarketDataUpdateTrade,
    OrderFillResponse, OrderUpdate, PositionUpdate, Reject, SecurityDefinitionResponse,
    TradeAccountResponse, TradeMode,
};

/// A sink for routed events.
pub trait EventConsumer: Send + Sync {
    /// Stable name used in dispatch reports and logs.
    fn name(&self) -> &str;

    fn on_logon(&self, _response: &LogonResponse) -> RouterResult<()> {
        Ok(())
    }

    fn on_heartbeat(&self, _heartbeat: &Heartbeat) -> RouterResult<()> {
        Ok(())
    }

    /// The pipeline committed a mode switch. Always dispatched before any
    /// event of the new mode.
    fn set_trading_mode(&self, _mode: TradeMode, _account: &str) -> RouterResult<()> {
        Ok(())
    }

    fn on_trade_account(&self, _response: &TradeAccountResponse) -> RouterResult<()> {
        Ok(())
    }

    /// Balance for the currently active mode.
    fn on_balance(&self, _mode: TradeMode, _update: &AccountBalanceUpdate) -> RouterResult<()> {
        Ok(())
    }

    fn on_position(&self, _update: &PositionUpdate) -> RouterResult<()> {
        Ok(())
    }

    /// A previously open position went flat.
    fn on_position_closed(&self, _symbol: &str) -> RouterResult<()> {
        Ok(())
    }

    fn on_order(&self, _update: &OrderUpdate) -> RouterResult<()> {
        Ok(())
    }

    fn on_order_fill(&self, _fill: &OrderFillResponse) -> RouterResult<()> {
        Ok(())
    }

    fn on_market_trade(&self, _tick: &MarketDataUpdateTrade) -> RouterResult<()> {
        Ok(())
    }

    fn on_market_bid_ask(&self, _tick: &MarketDataUpdateBidAsk) -> RouterResult<()> {
        Ok(())
    }

    fn on_security_definition(&self, _def: &SecurityDefinitionResponse) -> RouterResult<()> {
        Ok(())
    }

    fn on_reject(&self, _reject: &Reject) -> RouterResult<()> {
        Ok(())
    }

    /// Coalesced refresh tick. Consumers with a visible surface redraw here
    /// instead of on every event.
    fn update(&self) -> RouterResult<()> {
        Ok(())
    }
}

/// One consumer's failure during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub consumer: String,
    pub operation: &'static str,
    pub detail: String,
}

/// Aggregate outcome of routing one frame.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Consumers that completed the hook successfully.
    pub delivered: usize,
    /// Failures, one per failing consumer. Dispatch continues past them.
    pub failures: Vec<DispatchFailure>,
    /// True when the frame was dropped by a validity filter or gate
    /// instead of being dispatched.
    pub dropped: bool,
}

impl DispatchReport {
    pub fn dropped() -> Self {
        Self {
            dropped: true,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record(&mut self, consumer: &str, operation: &'static str, result: RouterResult<()>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(e) => self.failures.push(DispatchFailure {
                consumer: consumer.to_string(),
                operation,
                detail: e.to_string(),
            }),
        }
    }

    pub(crate) fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failures.extend(other.failures);
    }
}
