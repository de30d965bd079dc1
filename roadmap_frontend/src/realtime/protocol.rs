//! Text-frame codec for Socket.IO v4 running over an Engine.IO v4 websocket.
//!
//! Only the default namespace is spoken. Binary attachments are not used by
//! the backend and are rejected.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, RoadmapError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO open; carries the session handshake.
    Open(Handshake),
    Close,
    Ping,
    Pong,
    /// Socket.IO connect. Sent by the client with auth data, echoed by the
    /// server with the socket id.
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(String),
    Noop,
}

pub fn encode(packet: &Packet) -> String {
    match packet {
        Packet::Open(handshake) => format!(
            "0{}",
            serde_json::json!({
                "sid": handshake.sid,
                "pingInterval": handshake.ping_interval,
                "pingTimeout": handshake.ping_timeout,
            })
        ),
        Packet::Close => "1".to_string(),
        Packet::Ping => "2".to_string(),
        Packet::Pong => "3".to_string(),
        Packet::Connect(None) => "40".to_string(),
        Packet::Connect(Some(auth)) => format!("40{auth}"),
        Packet::Disconnect => "41".to_string(),
        Packet::Event { name, data } => {
            format!("42{}", Value::Array(vec![Value::String(name.clone()), data.clone()]))
        }
        Packet::ConnectError(message) => {
            format!("44{}", serde_json::json!({ "message": message }))
        }
        Packet::Noop => "6".to_string(),
    }
}

pub fn decode(frame: &str) -> Result<Packet> {
    let mut chars = frame.chars();
    let engine = chars
        .next()
        .ok_or_else(|| RoadmapError::Protocol("empty frame".into()))?;
    let rest = chars.as_str();
    match engine {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest),
        '6' => Ok(Packet::Noop),
        other => Err(RoadmapError::Protocol(format!(
            "unknown engine packet type {other:?}"
        ))),
    }
}

fn decode_socket(frame: &str) -> Result<Packet> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| RoadmapError::Protocol("empty socket packet".into()))?;
    let payload = strip_ack_id(strip_namespace(chars.as_str()));
    match kind {
        '0' => {
            if payload.trim().is_empty() {
                Ok(Packet::Connect(None))
            } else {
                Ok(Packet::Connect(Some(serde_json::from_str(payload)?)))
            }
        }
        '1' => Ok(Packet::Disconnect),
        '2' => {
            let mut parts = match serde_json::from_str::<Value>(payload)? {
                Value::Array(parts) => parts.into_iter(),
                _ => return Err(RoadmapError::Protocol("event payload is not an array".into())),
            };
            let name = match parts.next() {
                Some(Value::String(name)) => name,
                _ => return Err(RoadmapError::Protocol("event without a name".into())),
            };
            let data = parts.next().unwrap_or(Value::Null);
            Ok(Packet::Event { name, data })
        }
        '4' => {
            let message = serde_json::from_str::<Value>(payload)
                .ok()
                .and_then(|value| {
                    value
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| payload.to_string());
            Ok(Packet::ConnectError(message))
        }
        '5' | '6' => Err(RoadmapError::Protocol(
            "binary packets are not supported".into(),
        )),
        // Acks for emits we never request.
        '3' => Ok(Packet::Noop),
        other => Err(RoadmapError::Protocol(format!(
            "unknown socket packet type {other:?}"
        ))),
    }
}

fn strip_namespace(payload: &str) -> &str {
    if payload.starts_with('/') {
        match payload.find(',') {
            Some(comma) => &payload[comma + 1..],
            None => "",
        }
    } else {
        payload
    }
}

fn strip_ack_id(payload: &str) -> &str {
    payload.trim_start_matches(|c: char| c.is_ascii_digit())
}
