//! Inbound frame classification.
//!
//! Turns a raw JSON frame into a typed `DtcEvent` using the `Type`
//! discriminant. Classification is total: frames with a missing or
//! unrecognized discriminant, and frames whose payload fails to parse,
//! become `Unknown` carrying the raw value.

use dtc_core::event::{kind_for_discriminant, EventKind};
use dtc_core::DtcEvent;
use serde_json::Value;
use tracing::warn;

/// Classify one raw frame.
pub fn classify(raw: Value) -> DtcEvent {
    let Some(discriminant) = raw.get("Type") else {
        return DtcEvent::Unknown(raw);
    };

    let kind = kind_for_discriminant(discriminant);
    match parse_payload(kind, &raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(?kind, error = %e, "Payload failed to parse, treating as unknown");
            DtcEvent::Unknown(raw)
        }
    }
}

fn parse_payload(kind: EventKind, raw: &Value) -> serde_json::Result<DtcEvent> {
    let event = match kind {
        EventKind::LogonResponse => DtcEvent::Logon(serde_json::from_value(raw.clone())?),
        EventKind::Heartbeat => DtcEvent::Heartbeat(serde_json::from_value(raw.clone())?),
        EventKind::TradeAccountResponse => {
            DtcEvent::TradeAccount(serde_json::from_value(raw.clone())?)
        }
        EventKind::AccountBalanceUpdate => DtcEvent::Balance(serde_json::from_value(raw.clone())?),
        EventKind::PositionUpdate => DtcEvent::Position(serde_json::from_value(raw.clone())?),
        EventKind::OrderUpdate => DtcEvent::Order(serde_json::from_value(raw.clone())?),
        EventKind::OrderFillResponse => DtcEvent::OrderFill(serde_json::from_value(raw.clone())?),
        EventKind::MarketDataUpdateTrade => {
            DtcEvent::MarketTrade(serde_json::from_value(raw.clone())?)
        }
        EventKind::MarketDataUpdateBidAsk => {
            DtcEvent::MarketBidAsk(serde_json::from_value(raw.clone())?)
        }
        EventKind::SecurityDefinitionResponse => {
            DtcEvent::SecurityDefinition(serde_json::from_value(raw.clone())?)
        }
        EventKind::Reject => DtcEvent::Reject(serde_json::from_value(raw.clone())?),
        EventKind::Unknown => DtcEvent::Unknown(raw.clone()),
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtc_core::EventKind;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_classify_numeric_type() {
        let event = classify(json!({
            "Type": 306,
            "Symbol": "F.US.MESM25",
            "TradeAccount": "Sim1",
            "Quantity": 2,
            "AveragePrice": 5996.5
        }));
        match event {
            DtcEvent::Position(pos) => {
                assert_eq!(pos.symbol, "F.US.MESM25");
                assert_eq!(pos.quantity, dec!(2));
            }
            other => panic!("expected Position, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_classify_string_type_matches_numeric() {
        let numeric = classify(json!({"Type": 301, "Symbol": "MES", "TradeAccount": "Sim1"}));
        let named = classify(json!({"Type": "OrderUpdate", "Symbol": "MES", "TradeAccount": "Sim1"}));
        assert_eq!(numeric.kind(), EventKind::OrderUpdate);
        assert_eq!(named.kind(), EventKind::OrderUpdate);
    }

    #[test]
    fn test_classify_alias() {
        let event = classify(json!({"Type": "TradeAccountsResponse", "TradeAccount": "120005"}));
        assert_eq!(event.kind(), EventKind::TradeAccountResponse);
    }

    #[test]
    fn test_missing_type_is_unknown() {
        let raw = json!({"Symbol": "MES"});
        let event = classify(raw.clone());
        match event {
            DtcEvent::Unknown(value) => assert_eq!(value, raw),
            other => panic!("expected Unknown, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_unrecognized_type_is_unknown() {
        let event = classify(json!({"Type": 9999}));
        assert_eq!(event.kind(), EventKind::Unknown);
    }

    #[test]
    fn test_bad_payload_is_unknown() {
        // Quantity must be numeric; an object cannot parse.
        let event = classify(json!({"Type": 306, "Quantity": {"nested": true}}));
        assert_eq!(event.kind(), EventKind::Unknown);
    }
}
