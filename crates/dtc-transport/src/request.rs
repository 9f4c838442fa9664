//! Outbound DTC request builders.
//!
//! Requests are plain JSON objects with a numeric `Type` discriminant.
//! Request IDs start at 100 and increase monotonically per connection so
//! responses can be matched to their originating request in logs.

use dtc_core::event;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI32, Ordering};

/// Monotonic request ID source, one per connection.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicI32,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicI32::new(100),
        }
    }

    /// Allocate the next request ID.
    pub fn next_id(&self) -> i32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Logon handshake request, always the first frame sent.
pub fn logon_request(
    username: &str,
    password: &str,
    client_name: &str,
    protocol_version: u16,
    heartbeat_interval_secs: u64,
) -> Value {
    json!({
        "Type": event::LOGON_REQUEST,
        "ProtocolVersion": protocol_version,
        "HeartbeatIntervalInSeconds": heartbeat_interval_secs,
        "ClientName": client_name,
        "Username": username,
        "Password": password,
    })
}

/// Periodic heartbeat frame.
pub fn heartbeat() -> Value {
    json!({ "Type": event::HEARTBEAT })
}

/// Graceful logoff notice.
pub fn logoff(reason: &str) -> Value {
    json!({
        "Type": event::LOGOFF,
        "Reason": reason,
        "DoNotReconnect": 1,
    })
}

/// Enumerate trade accounts available on this connection.
pub fn trade_accounts_request(request_id: i32) -> Value {
    json!({
        "Type": event::TRADE_ACCOUNTS_REQUEST,
        "RequestID": request_id,
    })
}

/// Snapshot of open positions for one account.
pub fn current_positions_request(request_id: i32, trade_account: &str) -> Value {
    json!({
        "Type": event::CURRENT_POSITIONS_REQUEST,
        "RequestID": request_id,
        "TradeAccount": trade_account,
    })
}

/// Snapshot of working orders for one account.
pub fn open_orders_request(request_id: i32, trade_account: &str) -> Value {
    json!({
        "Type": event::OPEN_ORDERS_REQUEST,
        "RequestID": request_id,
        "TradeAccount": trade_account,
        "RequestAllOrders": 1,
    })
}

/// Historical fills for one account over the trailing `number_of_days`.
pub fn historical_order_fills_request(
    request_id: i32,
    trade_account: &str,
    number_of_days: u32,
) -> Value {
    json!({
        "Type": event::HISTORICAL_ORDER_FILLS_REQUEST,
        "RequestID": request_id,
        "TradeAccount": trade_account,
        "NumberOfDays": number_of_days,
    })
}

/// Balance snapshot for one account.
pub fn account_balance_request(request_id: i32, trade_account: &str) -> Value {
    json!({
        "Type": event::ACCOUNT_BALANCE_REQUEST,
        "RequestID": request_id,
        "TradeAccount": trade_account,
    })
}

/// Subscribe to market data for one symbol. `symbol_id` is caller-chosen
/// and echoed back in every tick for that symbol.
pub fn market_data_request(symbol_id: i32, symbol: &str, exchange: &str) -> Value {
    json!({
        "Type": event::MARKET_DATA_REQUEST,
        "RequestAction": 1,
        "SymbolID": symbol_id,
        "Symbol": symbol,
        "Exchange": exchange,
    })
}

/// Instrument definition lookup.
pub fn security_definition_request(request_id: i32, symbol: &str, exchange: &str) -> Value {
    json!({
        "Type": event::SECURITY_DEFINITION_REQUEST,
        "RequestID": request_id,
        "Symbol": symbol,
        "Exchange": exchange,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_start_at_100_and_increase() {
        let ids = RequestIdGenerator::new();
        assert_eq!(ids.next_id(), 100);
        assert_eq!(ids.next_id(), 101);
        assert_eq!(ids.next_id(), 102);
    }

    #[test]
    fn test_logon_request_shape() {
        let req = logon_request("user", "pass", "dtc-pipeline", 8, 5);
        assert_eq!(req["Type"], 1);
        assert_eq!(req["ProtocolVersion"], 8);
        assert_eq!(req["HeartbeatIntervalInSeconds"], 5);
        assert_eq!(req["Username"], "user");
        assert_eq!(req["ClientName"], "dtc-pipeline");
    }

    #[test]
    fn test_heartbeat_shape() {
        assert_eq!(heartbeat(), serde_json::json!({"Type": 3}));
    }

    #[test]
    fn test_probe_requests_carry_account_and_id() {
        let req = current_positions_request(104, "Sim1");
        assert_eq!(req["Type"], 500);
        assert_eq!(req["RequestID"], 104);
        assert_eq!(req["TradeAccount"], "Sim1");

        let req = historical_order_fills_request(105, "120005", 30);
        assert_eq!(req["Type"], 303);
        assert_eq!(req["NumberOfDays"], 30);

        let req = account_balance_request(106, "120005");
        assert_eq!(req["Type"], 601);
    }

    #[test]
    fn test_market_data_request_shape() {
        let req = market_data_request(1, "F.US.MESM25", "CME");
        assert_eq!(req["Type"], 101);
        assert_eq!(req["RequestAction"], 1);
        assert_eq!(req["SymbolID"], 1);
        assert_eq!(req["Symbol"], "F.US.MESM25");
    }
}
