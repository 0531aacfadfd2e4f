//! Wire envelopes
//!
//! ```text
//! ping         {"type":"ping","timestamp":1700000000000}
//! pong         {"type":"pong",...}                          (swallowed)
//! batch        {"type":"batch","messages":["..",".."],"count":2}
//! subscribe    {"type":"subscribe","resource":"loans","timestamp":...}
//! unsubscribe  {"type":"unsubscribe","resource":"loans","timestamp":...}
//! ```

use super::listeners::InboundMessage;
use crate::traits::*;
use serde_json::{json, Value};

pub const PING_TYPE: &str = "ping";
pub const PONG_TYPE: &str = "pong";
pub const BATCH_TYPE: &str = "batch";
pub const SUBSCRIBE_TYPE: &str = "subscribe";
pub const UNSUBSCRIBE_TYPE: &str = "unsubscribe";

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn ping() -> String {
    json!({ "type": PING_TYPE, "timestamp": now_millis() }).to_string()
}

pub fn batch(messages: &[String]) -> String {
    json!({
        "type": BATCH_TYPE,
        "messages": messages,
        "count": messages.len(),
    })
    .to_string()
}

pub fn subscribe(resource: &str) -> String {
    json!({ "type": SUBSCRIBE_TYPE, "resource": resource, "timestamp": now_millis() }).to_string()
}

pub fn unsubscribe(resource: &str) -> String {
    json!({ "type": UNSUBSCRIBE_TYPE, "resource": resource, "timestamp": now_millis() })
        .to_string()
}

/// Decode an inbound frame (text or UTF-8 binary) as JSON
pub fn decode(frame: &WsMessage) -> Result<InboundMessage> {
    serde_json::from_slice::<Value>(frame.as_bytes())
        .map(InboundMessage::new)
        .map_err(|e| LiveSocketError::Parse(e.to_string()))
}

#[inline]
pub fn is_pong(message: &InboundMessage) -> bool {
    message.kind.as_deref() == Some(PONG_TYPE)
}
