use serde_json::Value;

/// A WebSocket data frame, either Text or Binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the raw bytes of the frame regardless of its kind
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WsMessage::Text(s) => s.as_bytes(),
            WsMessage::Binary(b) => b,
        }
    }

    /// Check if message is text
    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }

    /// Check if message is binary
    pub fn is_binary(&self) -> bool {
        matches!(self, WsMessage::Binary(_))
    }
}

/// An outbound application payload
///
/// Strings are sent verbatim, JSON values are serialized once at send time.
/// Whatever the source, the manager stores and transmits the serialized text.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    /// Serialize into the text that goes on the wire
    pub fn into_text(self) -> String {
        match self {
            Payload::Text(text) => text,
            Payload::Json(value) => value.to_string(),
        }
    }

    /// The `type` label of a JSON payload, used for log lines
    pub fn kind(&self) -> Option<&str> {
        match self {
            Payload::Json(value) => value.get("type").and_then(Value::as_str),
            Payload::Text(_) => None,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}
