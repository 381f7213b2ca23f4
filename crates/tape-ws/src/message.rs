//! Wire protocol for the broker proxy socket.
//!
//! Inbound frames are JSON objects tagged by a `type` field. The set
//! of recognized types is closed; anything else is preserved in the
//! `Unknown` variant and republished on the catch-all stream rather
//! than dropped.

use crate::error::WsResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tape_core::AccountId;

/// Parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Heartbeat { sequence: u64, timestamp: i64 },
    AccountUpdate(Value),
    MarketData(Value),
    PositionUpdate(Value),
    Unknown { msg_type: String, raw: Value },
}

#[derive(Debug, Deserialize)]
struct HeartbeatFrame {
    sequence: u64,
    timestamp: i64,
}

/// Parse one text frame. Unknown or untyped frames never fail; they
/// become `Unknown`. Only malformed JSON is an error.
pub fn parse_inbound(text: &str) -> WsResult<Inbound> {
    let value: Value = serde_json::from_str(text)?;
    let msg_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let inbound = match msg_type.as_str() {
        "heartbeat" => {
            let frame: HeartbeatFrame = serde_json::from_value(value)?;
            Inbound::Heartbeat {
                sequence: frame.sequence,
                timestamp: frame.timestamp,
            }
        }
        "account_update" => Inbound::AccountUpdate(value),
        "market_data" => Inbound::MarketData(value),
        "position_update" => Inbound::PositionUpdate(value),
        _ => Inbound::Unknown {
            msg_type,
            raw: value,
        },
    };
    Ok(inbound)
}

/// Heartbeat acknowledgement. Echoes the server's sequence and
/// timestamp so the proxy can match the ack to its probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatAck {
    #[serde(rename = "type")]
    msg_type: String,
    pub sequence: u64,
    pub original_timestamp: i64,
    pub timestamp: i64,
    pub account_id: AccountId,
}

impl HeartbeatAck {
    pub fn new(sequence: u64, original_timestamp: i64, account_id: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            msg_type: "heartbeat_ack".to_string(),
            sequence,
            original_timestamp,
            timestamp: now.timestamp_millis(),
            account_id,
        }
    }
}

/// Post-open authentication message.
#[derive(Debug, Clone, Serialize)]
pub struct Authenticate<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    pub account_id: &'a AccountId,
}

impl<'a> Authenticate<'a> {
    pub fn new(account_id: &'a AccountId) -> Self {
        Self {
            msg_type: "authenticate",
            account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_heartbeat() {
        let inbound = parse_inbound(r#"{"type":"heartbeat","sequence":42,"timestamp":1700000000000}"#)
            .unwrap();
        assert_eq!(
            inbound,
            Inbound::Heartbeat {
                sequence: 42,
                timestamp: 1700000000000
            }
        );
    }

    #[test]
    fn test_parse_known_payload_types() {
        let inbound =
            parse_inbound(r#"{"type":"position_update","positions":[]}"#).unwrap();
        assert!(matches!(inbound, Inbound::PositionUpdate(_)));

        let inbound = parse_inbound(r#"{"type":"market_data","symbol":"NQ","last":21010}"#).unwrap();
        match inbound {
            Inbound::MarketData(payload) => assert_eq!(payload["symbol"], "NQ"),
            other => panic!("expected market data, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let inbound = parse_inbound(r#"{"type":"margin_call","severity":"high"}"#).unwrap();
        match inbound {
            Inbound::Unknown { msg_type, raw } => {
                assert_eq!(msg_type, "margin_call");
                assert_eq!(raw["severity"], "high");
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_untyped_frame_is_unknown_not_error() {
        let inbound = parse_inbound(r#"{"hello":"world"}"#).unwrap();
        assert!(matches!(inbound, Inbound::Unknown { ref msg_type, .. } if msg_type.is_empty()));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_inbound("not json").is_err());
    }

    #[test]
    fn test_ack_echoes_sequence_and_timestamp() {
        let now = Utc::now();
        let ack = HeartbeatAck::new(42, 1700000000000, AccountId::new("ACC-1"), now);
        let json = serde_json::to_value(&ack).unwrap();

        assert_eq!(json["type"], "heartbeat_ack");
        assert_eq!(json["sequence"], 42);
        assert_eq!(json["original_timestamp"], 1700000000000i64);
        assert_eq!(json["timestamp"], now.timestamp_millis());
        assert_eq!(json["account_id"], "ACC-1");
    }

    #[test]
    fn test_authenticate_shape() {
        let account = AccountId::new("ACC-1");
        let msg = serde_json::to_value(Authenticate::new(&account)).unwrap();
        assert_eq!(msg, json!({"type": "authenticate", "account_id": "ACC-1"}));
    }
}
