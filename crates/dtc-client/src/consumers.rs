//! Built-in consumers.

use dtc_core::{
    AccountBalanceUpdate, LogonResponse, OrderFillResponse, OrderUpdate, PositionUpdate, Reject,
    TradeMode,
};
use dtc_router::{EventConsumer, RouterResult};
use tracing::{debug, info, warn};

/// Consumer that narrates the event stream through tracing. Stands in for
/// a UI surface and doubles as a smoke signal in production logs.
#[derive(Debug, Default)]
pub struct LogConsumer;

impl EventConsumer for LogConsumer {
    fn name(&self) -> &str {
        "log"
    }

    fn on_logon(&self, response: &LogonResponse) -> RouterResult<()> {
        info!(
            server = %response.server_name,
            protocol = response.protocol_version,
            "Session established"
        );
        Ok(())
    }

    fn set_trading_mode(&self, mode: TradeMode, account: &str) -> RouterResult<()> {
        info!(mode = %mode.display_name(), account, "Trading mode");
        Ok(())
    }

    fn on_balance(&self, mode: TradeMode, update: &AccountBalanceUpdate) -> RouterResult<()> {
        if let Some(balance) = update.balance() {
            info!(%mode, account = %update.trade_account, %balance, "Balance");
        }
        Ok(())
    }

    fn on_position(&self, update: &PositionUpdate) -> RouterResult<()> {
        info!(
            symbol = %update.symbol,
            quantity = %update.quantity,
            account = %update.trade_account,
            "Position"
        );
        Ok(())
    }

    fn on_position_closed(&self, symbol: &str) -> RouterResult<()> {
        info!(symbol, "Position closed");
        Ok(())
    }

    fn on_order(&self, update: &OrderUpdate) -> RouterResult<()> {
        info!(
            symbol = %update.symbol,
            status = update.order_status,
            order_id = %update.server_order_id,
            "Order update"
        );
        Ok(())
    }

    fn on_order_fill(&self, fill: &OrderFillResponse) -> RouterResult<()> {
        info!(
            symbol = %fill.symbol,
            quantity = %fill.quantity,
            price = ?fill.price,
            "Fill"
        );
        Ok(())
    }

    fn on_reject(&self, reject: &Reject) -> RouterResult<()> {
        warn!(request_id = reject.request_id, text = %reject.reject_text, "Reject");
        Ok(())
    }

    fn update(&self) -> RouterResult<()> {
        debug!("Refresh tick");
        Ok(())
    }
}
