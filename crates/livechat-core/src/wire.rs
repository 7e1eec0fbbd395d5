//! Socket.IO wire format
//!
//! Text framing for the Engine.IO v4 WebSocket transport and the Socket.IO v5
//! packets carried inside it. Only what a chat viewer needs is modeled:
//! handshake, heartbeat, namespace connect and JSON events. Binary packets
//! and acknowledgements are recognized but not interpreted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::{LivechatError, ProtocolError, Result};
use crate::message::ChatMessage;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Engine.IO protocol revision spoken by the client
pub const ENGINE_IO_VERSION: u8 = 4;

/// Server event carrying one live message
pub const STREAM_MESSAGE_EVENT: &str = "streamMessage";

/// Server event carrying the full message history
pub const STREAM_MESSAGES_EVENT: &str = "streamMessages";

/// Client event requesting the full message history
pub const SYNC_EVENT: &str = "sync";

// ----------------------------------------------------------------------------
// Engine.IO Packets
// ----------------------------------------------------------------------------

/// Payload of the Engine.IO open packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// One Engine.IO text frame
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace connected, with the Socket.IO session id when provided
    Connect { sid: Option<String> },
    Disconnect,
    Event { name: String, args: Vec<Value> },
    /// Namespace connection refused by the server
    ConnectError { reason: String },
    /// Ack or binary packet, which this client never requests
    Unsupported { packet_type: char },
}

impl EnginePacket {
    /// Encode to a text frame
    pub fn encode(&self) -> Result<String> {
        let frame = match self {
            EnginePacket::Open(handshake) => {
                let mut frame = "0".to_string();
                frame.push_str(&serde_json::to_string(handshake)?);
                frame
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(packet) => {
                let mut frame = "4".to_string();
                frame.push_str(&packet.encode()?);
                frame
            }
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        };
        Ok(frame)
    }
}

impl SocketPacket {
    fn encode(&self) -> Result<String> {
        let body = match self {
            SocketPacket::Connect { sid: None } => "0".to_string(),
            SocketPacket::Connect { sid: Some(sid) } => {
                format!("0{}", serde_json::json!({ "sid": sid }))
            }
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                format!("2{}", serde_json::to_string(&array)?)
            }
            SocketPacket::ConnectError { reason } => {
                format!("4{}", serde_json::json!({ "message": reason }))
            }
            SocketPacket::Unsupported { packet_type } => {
                return Err(ProtocolError::UnknownSocketPacket {
                    packet_type: *packet_type,
                }
                .into())
            }
        };
        Ok(body)
    }

    fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let packet_type = chars.next().ok_or(ProtocolError::EmptyFrame)?;
        let rest = strip_ack_id(strip_namespace(chars.as_str()));

        match packet_type {
            '0' => {
                let sid = if rest.is_empty() {
                    None
                } else {
                    let payload: Value = serde_json::from_str(rest)?;
                    payload.get("sid").and_then(Value::as_str).map(str::to_string)
                };
                Ok(SocketPacket::Connect { sid })
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let payload: Value = serde_json::from_str(rest)?;
                let Value::Array(mut items) = payload else {
                    return Err(LivechatError::malformed_event("event payload is not an array"));
                };
                if items.is_empty() {
                    return Err(LivechatError::malformed_event("event payload has no name"));
                }
                let Value::String(name) = items.remove(0) else {
                    return Err(LivechatError::malformed_event("event name is not a string"));
                };
                Ok(SocketPacket::Event { name, args: items })
            }
            '4' => {
                let reason = serde_json::from_str::<Value>(rest)
                    .ok()
                    .and_then(|payload| match payload {
                        Value::String(reason) => Some(reason),
                        Value::Object(object) => object
                            .get("message")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        _ => None,
                    })
                    .unwrap_or_else(|| rest.to_string());
                Ok(SocketPacket::ConnectError { reason })
            }
            '3' | '5' | '6' => Ok(SocketPacket::Unsupported { packet_type }),
            other => Err(ProtocolError::UnknownSocketPacket { packet_type: other }.into()),
        }
    }
}

/// Decode one Engine.IO text frame
pub fn decode_frame(frame: &str) -> Result<EnginePacket> {
    let mut chars = frame.chars();
    let packet_type = chars.next().ok_or(ProtocolError::EmptyFrame)?;
    let rest = chars.as_str();

    match packet_type {
        '0' => serde_json::from_str(rest)
            .map(EnginePacket::Open)
            .map_err(|error| {
                LivechatError::from(ProtocolError::MalformedHandshake {
                    reason: error.to_string(),
                })
            }),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => SocketPacket::decode(rest).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownEnginePacket { packet_type: other }.into()),
    }
}

/// Skip a `/namespace,` prefix; the default namespace has none
fn strip_namespace(frame: &str) -> &str {
    if frame.starts_with('/') {
        match frame.find(',') {
            Some(index) => &frame[index + 1..],
            None => "",
        }
    } else {
        frame
    }
}

fn strip_ack_id(frame: &str) -> &str {
    frame.trim_start_matches(|c: char| c.is_ascii_digit())
}

// ----------------------------------------------------------------------------
// Chat Events
// ----------------------------------------------------------------------------

/// Chat event received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    StreamMessage(ChatMessage),
    StreamMessages(Vec<ChatMessage>),
    /// Any other event name, ignored by the session
    Other { name: String },
}

impl ServerEvent {
    /// Interpret a Socket.IO event
    ///
    /// Returns `None` for a `streamMessage` whose payload cannot be identified
    /// as a message; the event is dropped rather than failing the connection.
    pub fn from_event(name: String, args: Vec<Value>) -> Option<Self> {
        let payload = args.into_iter().next().unwrap_or(Value::Null);
        match name.as_str() {
            STREAM_MESSAGE_EVENT => ChatMessage::from_json(payload).map(ServerEvent::StreamMessage),
            STREAM_MESSAGES_EVENT => Some(ServerEvent::StreamMessages(
                ChatMessage::batch_from_json(payload),
            )),
            _ => {
                debug!("Ignoring server event {:?}", name);
                Some(ServerEvent::Other { name })
            }
        }
    }
}

/// Chat event sent to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    Sync,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Sync => SYNC_EVENT,
        }
    }

    /// Complete text frame for this event
    pub fn encode(&self) -> Result<String> {
        EnginePacket::Message(SocketPacket::Event {
            name: self.name().to_string(),
            args: Vec::new(),
        })
        .encode()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_handshake() {
        let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        match decode_frame(frame).unwrap() {
            EnginePacket::Open(handshake) => {
                assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(handshake.ping_interval, 25000);
                assert_eq!(handshake.ping_timeout, 20000);
                assert_eq!(handshake.max_payload, Some(1_000_000));
            }
            other => panic!("Expected open packet, got {:?}", other),
        }

        assert!(matches!(
            decode_frame("0{}"),
            Err(LivechatError::Protocol(ProtocolError::MalformedHandshake { .. }))
        ));
    }

    #[test]
    fn test_heartbeat_frames() {
        assert_eq!(decode_frame("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(decode_frame("2probe").unwrap(), EnginePacket::Ping("probe".to_string()));
        assert_eq!(EnginePacket::Pong(String::new()).encode().unwrap(), "3");
        assert_eq!(decode_frame("6").unwrap(), EnginePacket::Noop);
    }

    #[test]
    fn test_namespace_connect() {
        assert_eq!(
            EnginePacket::Message(SocketPacket::Connect { sid: None })
                .encode()
                .unwrap(),
            "40"
        );
        assert_eq!(
            decode_frame(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap(),
            EnginePacket::Message(SocketPacket::Connect {
                sid: Some("wZX3oN0bSVIhsaknAAAI".to_string())
            })
        );
        assert_eq!(
            decode_frame(r#"44{"message":"Not authorized"}"#).unwrap(),
            EnginePacket::Message(SocketPacket::ConnectError {
                reason: "Not authorized".to_string()
            })
        );
    }

    #[test]
    fn test_sync_encoding() {
        assert_eq!(ClientEvent::Sync.encode().unwrap(), r#"42["sync"]"#);
    }

    #[test]
    fn test_decode_stream_events() {
        let frame = r#"42["streamMessage",{"id":"1","source":"SYSTEM","timestamp":10,"message":"hi"}]"#;
        let EnginePacket::Message(SocketPacket::Event { name, args }) = decode_frame(frame).unwrap()
        else {
            panic!("Expected event packet");
        };
        match ServerEvent::from_event(name, args) {
            Some(ServerEvent::StreamMessage(message)) => {
                assert_eq!(message.id().as_str(), "1");
                assert_eq!(message.text(), "hi");
            }
            other => panic!("Expected streamMessage, got {:?}", other),
        }

        let history = ServerEvent::from_event(
            STREAM_MESSAGES_EVENT.to_string(),
            vec![json!([
                { "id": "a", "source": "SYSTEM", "timestamp": 1 },
                { "source": "SYSTEM", "timestamp": 2 },
                { "id": "c", "source": "YT", "timestamp": 3 }
            ])],
        );
        match history {
            Some(ServerEvent::StreamMessages(messages)) => assert_eq!(messages.len(), 2),
            other => panic!("Expected streamMessages, got {:?}", other),
        }

        assert_eq!(
            ServerEvent::from_event("viewerCount".to_string(), vec![json!(12)]),
            Some(ServerEvent::Other {
                name: "viewerCount".to_string()
            })
        );
    }

    #[test]
    fn test_namespaced_and_acked_events() {
        let packet = decode_frame(r#"42/chat,17["streamMessages",[]]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "streamMessages".to_string(),
                args: vec![json!([])]
            })
        );
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(
            decode_frame(""),
            Err(LivechatError::Protocol(ProtocolError::EmptyFrame))
        ));
        assert!(matches!(
            decode_frame("9"),
            Err(LivechatError::Protocol(ProtocolError::UnknownEnginePacket { packet_type: '9' }))
        ));
        assert!(matches!(
            decode_frame("42{}"),
            Err(LivechatError::Protocol(ProtocolError::MalformedEvent { .. }))
        ));
        assert!(decode_frame("42[").is_err());
        assert_eq!(
            decode_frame("45").unwrap(),
            EnginePacket::Message(SocketPacket::Unsupported { packet_type: '5' })
        );
    }
}
