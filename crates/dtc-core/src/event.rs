//! Typed DTC event payloads.
//!
//! Every wire frame is a JSON object carrying a `Type` discriminant, either
//! as the numeric DTC message code or as its PascalCase name. The payload
//! structs below mirror the wire field names; `DtcEvent` is the tagged union
//! produced by the classifier so that nothing downstream probes raw JSON.

use crate::mode::TradeMode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DTC message type codes (JSON encoding)
// ---------------------------------------------------------------------------

pub const LOGON_REQUEST: u16 = 1;
pub const LOGON_RESPONSE: u16 = 2;
pub const HEARTBEAT: u16 = 3;
pub const LOGOFF: u16 = 4;

pub const MARKET_DATA_REQUEST: u16 = 101;
pub const MARKET_DATA_REJECT: u16 = 103;
pub const MARKET_DATA_UPDATE_TRADE: u16 = 107;
pub const MARKET_DATA_UPDATE_BID_ASK: u16 = 108;

pub const ORDER_UPDATE: u16 = 301;
pub const HISTORICAL_ORDER_FILLS_REQUEST: u16 = 303;
pub const HISTORICAL_ORDER_FILL_RESPONSE: u16 = 304;
pub const OPEN_ORDERS_REQUEST: u16 = 305;
pub const POSITION_UPDATE: u16 = 306;
pub const ORDER_FILL_RESPONSE: u16 = 307;
pub const ORDER_REJECT: u16 = 312;

pub const TRADE_ACCOUNTS_REQUEST: u16 = 400;
pub const TRADE_ACCOUNT_RESPONSE: u16 = 401;
pub const CURRENT_POSITIONS_REQUEST: u16 = 500;
pub const SECURITY_DEFINITION_REQUEST: u16 = 506;
pub const SECURITY_DEFINITION_RESPONSE: u16 = 507;
pub const ACCOUNT_BALANCE_UPDATE: u16 = 600;
pub const ACCOUNT_BALANCE_REQUEST: u16 = 601;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Semantic message kind, the routing discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LogonResponse,
    Heartbeat,
    TradeAccountResponse,
    AccountBalanceUpdate,
    PositionUpdate,
    OrderUpdate,
    OrderFillResponse,
    MarketDataUpdateTrade,
    MarketDataUpdateBidAsk,
    SecurityDefinitionResponse,
    Reject,
    Unknown,
}

/// Map a wire discriminant to its event kind.
///
/// Accepts both the numeric DTC code and the PascalCase name, including the
/// aliases the feed is known to emit. Anything unmatched is `Unknown`.
#[must_use]
pub fn kind_for_discriminant(discriminant: &serde_json::Value) -> EventKind {
    match discriminant {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map_or(EventKind::Unknown, |code| kind_for_code(code)),
        serde_json::Value::String(s) => kind_for_name(s),
        _ => EventKind::Unknown,
    }
}

fn kind_for_code(code: u64) -> EventKind {
    match code {
        c if c == u64::from(LOGON_RESPONSE) => EventKind::LogonResponse,
        c if c == u64::from(HEARTBEAT) => EventKind::Heartbeat,
        c if c == u64::from(TRADE_ACCOUNT_RESPONSE) => EventKind::TradeAccountResponse,
        c if c == u64::from(ACCOUNT_BALANCE_UPDATE) => EventKind::AccountBalanceUpdate,
        c if c == u64::from(POSITION_UPDATE) => EventKind::PositionUpdate,
        c if c == u64::from(ORDER_UPDATE) => EventKind::OrderUpdate,
        c if c == u64::from(ORDER_FILL_RESPONSE) => EventKind::OrderFillResponse,
        c if c == u64::from(HISTORICAL_ORDER_FILL_RESPONSE) => EventKind::OrderFillResponse,
        c if c == u64::from(MARKET_DATA_UPDATE_TRADE) => EventKind::MarketDataUpdateTrade,
        c if c == u64::from(MARKET_DATA_UPDATE_BID_ASK) => EventKind::MarketDataUpdateBidAsk,
        c if c == u64::from(SECURITY_DEFINITION_RESPONSE) => EventKind::SecurityDefinitionResponse,
        c if c == u64::from(MARKET_DATA_REJECT) => EventKind::Reject,
        c if c == u64::from(ORDER_REJECT) => EventKind::Reject,
        _ => EventKind::Unknown,
    }
}

fn kind_for_name(name: &str) -> EventKind {
    match name {
        "LogonResponse" => EventKind::LogonResponse,
        "Heartbeat" => EventKind::Heartbeat,
        "TradeAccountResponse" | "TradeAccountsResponse" => EventKind::TradeAccountResponse,
        "AccountBalanceUpdate" | "AccountBalanceResponse" => EventKind::AccountBalanceUpdate,
        "PositionUpdate" => EventKind::PositionUpdate,
        "OrderUpdate" => EventKind::OrderUpdate,
        "OrderFillResponse" | "HistoricalOrderFillResponse" => EventKind::OrderFillResponse,
        "MarketDataUpdateTrade" | "MarketDataSnapshot" | "MarketDataUpdateLastTrade" => {
            EventKind::MarketDataUpdateTrade
        }
        "MarketDataUpdateBidAsk" => EventKind::MarketDataUpdateBidAsk,
        "SecurityDefinitionResponse" | "SecurityDefinitionForSymbolResponse" => {
            EventKind::SecurityDefinitionResponse
        }
        "MarketDataReject" | "OrderReject" => EventKind::Reject,
        _ => EventKind::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Logon handshake acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogonResponse {
    #[serde(default)]
    pub result: i32,
    #[serde(default)]
    pub result_text: String,
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub protocol_version: i32,
}

impl LogonResponse {
    /// DTC logon success code is 1.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == 1
    }
}

/// Heartbeat exchanged bidirectionally on a fixed interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Heartbeat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_dropped_messages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_date_time: Option<i64>,
}

/// Trade account enumeration entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeAccountResponse {
    #[serde(default)]
    pub trade_account: String,
    #[serde(default, rename = "RequestID")]
    pub request_id: i32,
    #[serde(default)]
    pub message_number: i32,
    #[serde(default)]
    pub total_number_messages: i32,
}

/// Account balance snapshot for one trade account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountBalanceUpdate {
    #[serde(default)]
    pub trade_account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_funds: Option<Decimal>,
    #[serde(default)]
    pub account_currency: String,
}

impl AccountBalanceUpdate {
    /// Preferred balance figure: cash balance, falling back to account value.
    #[must_use]
    pub fn balance(&self) -> Option<Decimal> {
        self.cash_balance.or(self.account_value)
    }
}

/// Position snapshot or live update for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PositionUpdate {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub trade_account: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_price: Option<Decimal>,
    /// 1 when pushed by the server outside a request/response cycle.
    #[serde(default)]
    pub unsolicited: i32,
    #[serde(default)]
    pub update_reason: String,
    #[serde(default)]
    pub message_number: i32,
    #[serde(default)]
    pub total_number_messages: i32,
}

impl PositionUpdate {
    /// Flat/closed position marker.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// True when the reference price is missing or zero (ghost snapshot).
    #[must_use]
    pub fn has_reference_price(&self) -> bool {
        self.average_price.is_some_and(|p| !p.is_zero())
    }
}

/// Order state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderUpdate {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub trade_account: String,
    #[serde(default)]
    pub order_status: i32,
    #[serde(default)]
    pub buy_sell: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price1: Option<Decimal>,
    #[serde(default)]
    pub filled_quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_fill_price: Option<Decimal>,
    #[serde(default, rename = "ServerOrderID")]
    pub server_order_id: String,
    #[serde(default)]
    pub update_reason: String,
}

impl OrderUpdate {
    /// DTC order status codes 3 and 7 both report a filled order.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        matches!(self.order_status, 3 | 7)
    }
}

/// Executed fill, live or historical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderFillResponse {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub trade_account: String,
    #[serde(default)]
    pub buy_sell: i32,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    #[serde(default)]
    pub date_time: i64,
}

/// Last-trade market data tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketDataUpdateTrade {
    #[serde(default, rename = "SymbolID")]
    pub symbol_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub date_time: f64,
}

/// Top-of-book market data tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketDataUpdateBidAsk {
    #[serde(default, rename = "SymbolID")]
    pub symbol_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_quantity: Option<Decimal>,
}

/// Instrument definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityDefinitionResponse {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default, rename = "RequestID")]
    pub request_id: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price_increment: Option<Decimal>,
}

/// Server-side rejection of a prior request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reject {
    #[serde(default, rename = "RequestID")]
    pub request_id: i32,
    #[serde(default)]
    pub reject_text: String,
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// A classified inbound event.
///
/// `Unknown` keeps the raw frame so a catch-all hook can still observe it;
/// it is never dispatched to typed consumers.
#[derive(Debug, Clone)]
pub enum DtcEvent {
    Logon(LogonResponse),
    Heartbeat(Heartbeat),
    TradeAccount(TradeAccountResponse),
    Balance(AccountBalanceUpdate),
    Position(PositionUpdate),
    Order(OrderUpdate),
    OrderFill(OrderFillResponse),
    MarketTrade(MarketDataUpdateTrade),
    MarketBidAsk(MarketDataUpdateBidAsk),
    SecurityDefinition(SecurityDefinitionResponse),
    Reject(Reject),
    Unknown(serde_json::Value),
}

impl DtcEvent {
    /// The kind this event was classified as.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Logon(_) => EventKind::LogonResponse,
            Self::Heartbeat(_) => EventKind::Heartbeat,
            Self::TradeAccount(_) => EventKind::TradeAccountResponse,
            Self::Balance(_) => EventKind::AccountBalanceUpdate,
            Self::Position(_) => EventKind::PositionUpdate,
            Self::Order(_) => EventKind::OrderUpdate,
            Self::OrderFill(_) => EventKind::OrderFillResponse,
            Self::MarketTrade(_) => EventKind::MarketDataUpdateTrade,
            Self::MarketBidAsk(_) => EventKind::MarketDataUpdateBidAsk,
            Self::SecurityDefinition(_) => EventKind::SecurityDefinitionResponse,
            Self::Reject(_) => EventKind::Reject,
            Self::Unknown(_) => EventKind::Unknown,
        }
    }

    /// The trade account the event belongs to, when it carries one.
    #[must_use]
    pub fn trade_account(&self) -> Option<&str> {
        let account = match self {
            Self::TradeAccount(m) => &m.trade_account,
            Self::Balance(m) => &m.trade_account,
            Self::Position(m) => &m.trade_account,
            Self::Order(m) => &m.trade_account,
            Self::OrderFill(m) => &m.trade_account,
            _ => return None,
        };
        if account.is_empty() {
            None
        } else {
            Some(account)
        }
    }
}

/// Classify an account identifier into its trade mode.
///
/// Pure and total: empty or unrecognized accounts map to DEBUG, the
/// configured live account maps to LIVE, `Sim*` accounts map to SIM.
#[must_use]
pub fn mode_for_account(account: &str, live_account: &str) -> TradeMode {
    let account = account.trim();
    if account.is_empty() {
        return TradeMode::Debug;
    }
    if !live_account.is_empty() && account == live_account {
        return TradeMode::Live;
    }
    if account.starts_with("Sim") {
        return TradeMode::Sim;
    }
    TradeMode::Debug
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_kind_for_numeric_discriminant() {
        assert_eq!(kind_for_discriminant(&json!(306)), EventKind::PositionUpdate);
        assert_eq!(kind_for_discriminant(&json!(301)), EventKind::OrderUpdate);
        assert_eq!(
            kind_for_discriminant(&json!(600)),
            EventKind::AccountBalanceUpdate
        );
        assert_eq!(kind_for_discriminant(&json!(3)), EventKind::Heartbeat);
        assert_eq!(kind_for_discriminant(&json!(312)), EventKind::Reject);
        assert_eq!(kind_for_discriminant(&json!(9999)), EventKind::Unknown);
    }

    #[test]
    fn test_kind_for_string_discriminant_with_aliases() {
        assert_eq!(
            kind_for_discriminant(&json!("PositionUpdate")),
            EventKind::PositionUpdate
        );
        assert_eq!(
            kind_for_discriminant(&json!("TradeAccountsResponse")),
            EventKind::TradeAccountResponse
        );
        assert_eq!(
            kind_for_discriminant(&json!("AccountBalanceResponse")),
            EventKind::AccountBalanceUpdate
        );
        assert_eq!(
            kind_for_discriminant(&json!("HistoricalOrderFillResponse")),
            EventKind::OrderFillResponse
        );
        assert_eq!(
            kind_for_discriminant(&json!("MarketDataUpdateLastTrade")),
            EventKind::MarketDataUpdateTrade
        );
        assert_eq!(
            kind_for_discriminant(&json!("SomethingElse")),
            EventKind::Unknown
        );
    }

    #[test]
    fn test_kind_for_non_scalar_discriminant() {
        assert_eq!(kind_for_discriminant(&json!(null)), EventKind::Unknown);
        assert_eq!(kind_for_discriminant(&json!([306])), EventKind::Unknown);
    }

    #[test]
    fn test_position_update_parsing() {
        let json = json!({
            "Type": 306,
            "Symbol": "F.US.MESM25",
            "TradeAccount": "Sim1",
            "Quantity": 2,
            "AveragePrice": 5996.5,
            "Unsolicited": 1
        });

        let pos: PositionUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(pos.symbol, "F.US.MESM25");
        assert_eq!(pos.trade_account, "Sim1");
        assert_eq!(pos.quantity, dec!(2));
        assert!(!pos.is_flat());
        assert!(pos.has_reference_price());
    }

    #[test]
    fn test_position_update_missing_price_is_stale() {
        let json = json!({"Symbol": "MNQ", "TradeAccount": "Sim1", "Quantity": 1});
        let pos: PositionUpdate = serde_json::from_value(json).unwrap();
        assert!(!pos.has_reference_price());

        let json = json!({"Symbol": "MNQ", "TradeAccount": "Sim1", "Quantity": 1, "AveragePrice": 0});
        let pos: PositionUpdate = serde_json::from_value(json).unwrap();
        assert!(!pos.has_reference_price());
    }

    #[test]
    fn test_order_update_filled_statuses() {
        for status in [3, 7] {
            let json = json!({"Symbol": "MES", "TradeAccount": "120005", "OrderStatus": status});
            let order: OrderUpdate = serde_json::from_value(json).unwrap();
            assert!(order.is_filled());
        }
        let json = json!({"Symbol": "MES", "TradeAccount": "120005", "OrderStatus": 1});
        let order: OrderUpdate = serde_json::from_value(json).unwrap();
        assert!(!order.is_filled());
    }

    #[test]
    fn test_balance_fallback_to_account_value() {
        let json = json!({"TradeAccount": "120005", "AccountValue": 25000.0});
        let bal: AccountBalanceUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(bal.balance(), Some(dec!(25000.0)));

        let json = json!({"TradeAccount": "120005", "CashBalance": 100.5, "AccountValue": 200});
        let bal: AccountBalanceUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(bal.balance(), Some(dec!(100.5)));
    }

    #[test]
    fn test_payload_roundtrip_preserves_fields() {
        let original = PositionUpdate {
            symbol: "F.US.MESM25".to_string(),
            trade_account: "120005".to_string(),
            quantity: dec!(3),
            average_price: Some(dec!(6001.25)),
            unsolicited: 1,
            update_reason: "CurrentPositionsRequestResponse".to_string(),
            message_number: 1,
            total_number_messages: 1,
        };

        let encoded = serde_json::to_value(&original).unwrap();
        assert_eq!(encoded["Symbol"], "F.US.MESM25");
        assert_eq!(encoded["TradeAccount"], "120005");

        let decoded: PositionUpdate = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_event_trade_account_accessor() {
        let order = DtcEvent::Order(OrderUpdate {
            symbol: "MES".to_string(),
            trade_account: "Sim1".to_string(),
            order_status: 1,
            buy_sell: 1,
            price1: None,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            server_order_id: String::new(),
            update_reason: String::new(),
        });
        assert_eq!(order.trade_account(), Some("Sim1"));

        let hb = DtcEvent::Heartbeat(Heartbeat::default());
        assert_eq!(hb.trade_account(), None);
    }

    #[test]
    fn test_mode_for_account() {
        assert_eq!(mode_for_account("", "120005"), TradeMode::Debug);
        assert_eq!(mode_for_account("  ", "120005"), TradeMode::Debug);
        assert_eq!(mode_for_account("120005", "120005"), TradeMode::Live);
        assert_eq!(mode_for_account("Sim1", "120005"), TradeMode::Sim);
        assert_eq!(mode_for_account("Sim2", "120005"), TradeMode::Sim);
        assert_eq!(mode_for_account("Unknown123", "120005"), TradeMode::Debug);
        // No live account configured: nothing maps to LIVE.
        assert_eq!(mode_for_account("120005", ""), TradeMode::Debug);
    }
}
