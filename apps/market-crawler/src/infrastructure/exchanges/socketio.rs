//! Socket.IO v2 / Engine.IO v3 Text Codec
//!
//! Just enough of the protocol to speak Socket.IO over a plain WebSocket
//! transport (`?EIO=3&transport=websocket`).
//!
//! # Packet Layout
//!
//! A text frame is an Engine.IO packet type digit followed by its data.
//! Engine.IO `message` packets (`4`) carry a Socket.IO packet whose type is
//! the next digit:
//!
//! | Frame                 | Meaning                                 |
//! |-----------------------|-----------------------------------------|
//! | `0{json}`             | open handshake (`sid`, `pingInterval`)  |
//! | `1`                   | transport close                         |
//! | `2` / `3`             | ping / pong                             |
//! | `40`                  | namespace connected                     |
//! | `41`                  | namespace disconnected                  |
//! | `42[name, args...]`   | event (optional ack id before `[`)      |
//! | `6`                   | noop                                    |

use serde::Deserialize;
use serde_json::Value;

use crate::application::ports::NormalizeError;

/// Engine.IO ping frame.
pub const PING: &str = "2";

/// Engine.IO pong frame.
pub const PONG: &str = "3";

/// Engine.IO open handshake payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Session id.
    pub sid: String,
    /// Server ping interval in milliseconds.
    #[serde(default)]
    pub ping_interval: u64,
    /// Server ping timeout in milliseconds.
    #[serde(default)]
    pub ping_timeout: u64,
}

/// A decoded text packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `0`
    Open(OpenHandshake),
    /// `1`
    Close,
    /// `2`
    Ping,
    /// `3`
    Pong,
    /// `40`
    Connect,
    /// `41`
    Disconnect,
    /// `42`
    Event {
        /// Event name.
        name: String,
        /// First argument, `Null` when absent.
        args: Value,
    },
    /// `6`
    Noop,
    /// Anything else (acks, errors, binary placeholders).
    Other(String),
}

/// Decode one text frame.
///
/// # Errors
///
/// Returns [`NormalizeError::Envelope`] for an empty frame or an event
/// without a name, and [`NormalizeError::Malformed`] for invalid JSON.
pub fn decode(text: &str) -> Result<Packet, NormalizeError> {
    let mut chars = text.chars();
    let Some(engine_type) = chars.next() else {
        return Err(NormalizeError::Envelope("empty socket.io frame".to_string()));
    };
    let rest = chars.as_str();

    match engine_type {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest),
        '6' => Ok(Packet::Noop),
        _ => Ok(Packet::Other(text.to_string())),
    }
}

fn decode_message(body: &str) -> Result<Packet, NormalizeError> {
    let mut chars = body.chars();
    match chars.next() {
        // Connect may carry a namespace, e.g. `40/chat,`.
        Some('0') => Ok(Packet::Connect),
        Some('1') => Ok(Packet::Disconnect),
        Some('2') => decode_event(chars.as_str()),
        _ => Ok(Packet::Other(format!("4{body}"))),
    }
}

fn decode_event(body: &str) -> Result<Packet, NormalizeError> {
    // Skip an optional namespace (`/ns,`) and ack id (digits).
    let body = match body.strip_prefix('/') {
        Some(ns) => ns.split_once(',').map_or("", |(_, rest)| rest),
        None => body,
    };
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());

    let array: Vec<Value> = serde_json::from_str(body)?;
    let mut items = array.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => {
            return Err(NormalizeError::Envelope(
                "socket.io event without a name".to_string(),
            ));
        }
    };

    Ok(Packet::Event {
        name,
        args: items.next().unwrap_or(Value::Null),
    })
}

/// Encode an event frame: `42["name",args]`.
#[must_use]
pub fn encode_event(name: &str, args: &Value) -> String {
    format!("42{}", Value::Array(vec![Value::String(name.to_string()), args.clone()]))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case("1", Packet::Close)]
    #[test_case("2", Packet::Ping)]
    #[test_case("3", Packet::Pong)]
    #[test_case("40", Packet::Connect)]
    #[test_case("41", Packet::Disconnect)]
    #[test_case("6", Packet::Noop)]
    fn decodes_control_packets(frame: &str, expected: Packet) {
        assert_eq!(decode(frame).unwrap(), expected);
    }

    #[test]
    fn decodes_open_handshake() {
        let packet =
            decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#)
                .unwrap();
        assert_eq!(
            packet,
            Packet::Open(OpenHandshake {
                sid: "abc".to_string(),
                ping_interval: 25_000,
                ping_timeout: 60_000,
            })
        );
    }

    #[test]
    fn decodes_event() {
        let packet = decode(r#"42["push.symbol",{"symbol":"BTC_USDT"}]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "push.symbol".to_string(),
                args: json!({"symbol": "BTC_USDT"}),
            }
        );
    }

    #[test]
    fn decodes_event_with_ack_id_and_namespace() {
        let packet = decode(r#"42/market,17["rs.symbol","ok"]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "rs.symbol".to_string(),
                args: json!("ok"),
            }
        );
    }

    #[test]
    fn event_without_args_is_null() {
        let packet = decode(r#"42["ping"]"#).unwrap();
        assert!(matches!(packet, Packet::Event { args: Value::Null, .. }));
    }

    #[test]
    fn nameless_event_rejected() {
        assert!(matches!(decode("42[1,2]"), Err(NormalizeError::Envelope(_))));
    }

    #[test]
    fn empty_frame_rejected() {
        assert!(matches!(decode(""), Err(NormalizeError::Envelope(_))));
    }

    #[test]
    fn invalid_event_json_is_malformed() {
        assert!(matches!(decode("42[\"x\","), Err(NormalizeError::Malformed(_))));
    }

    #[test]
    fn encodes_event() {
        let frame = encode_event("sub.symbol", &json!({"symbol": "BTC_USDT"}));
        assert_eq!(frame, r#"42["sub.symbol",{"symbol":"BTC_USDT"}]"#);
        assert!(matches!(decode(&frame).unwrap(), Packet::Event { ref name, .. } if name == "sub.symbol"));
    }
}
