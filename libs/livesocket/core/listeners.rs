//! Typed listener registry
//!
//! Listeners subscribe to an [`EventLabel`]:
//!
//! ```text
//! inbound {"type":"alert",...} ──> on_message hook
//!                               ──> EventLabel::Type("alert") listeners
//!                               ──> EventLabel::All listeners
//! open / close / give up       ──> EventLabel::Connection listeners
//! transport error              ──> EventLabel::Error listeners
//! ```
//!
//! The registry belongs to one manager. Callbacks are cloned out of the lock
//! before they run, so a listener may freely call `on`/`off`/`send`.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::error;

/// What a listener subscribes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventLabel {
    /// Connection status changes (`"connection"`)
    Connection,
    /// Transport errors (`"error"`)
    Error,
    /// Every inbound message, whatever its type (`"*"`)
    All,
    /// Inbound messages whose `type` field equals this label
    Type(String),
}

impl EventLabel {
    pub fn message_type(kind: impl Into<String>) -> Self {
        EventLabel::Type(kind.into())
    }
}

impl From<&str> for EventLabel {
    fn from(label: &str) -> Self {
        match label {
            "connection" => EventLabel::Connection,
            "error" => EventLabel::Error,
            "*" => EventLabel::All,
            other => EventLabel::Type(other.to_string()),
        }
    }
}

impl From<String> for EventLabel {
    fn from(label: String) -> Self {
        EventLabel::from(label.as_str())
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLabel::Connection => f.write_str("connection"),
            EventLabel::Error => f.write_str("error"),
            EventLabel::All => f.write_str("*"),
            EventLabel::Type(kind) => f.write_str(kind),
        }
    }
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// The `type` field, when the payload has a string one
    pub kind: Option<String>,
    pub payload: Value,
}

impl InboundMessage {
    pub fn new(payload: Value) -> Self {
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { kind, payload }
    }
}

/// Payload of a `connection` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected { code: u16, reason: String },
    /// Reconnect attempts exhausted; only a manual reconnect resumes
    Failed { attempts: u32 },
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected { .. } => "disconnected",
            ConnectionStatus::Failed { .. } => "failed",
        }
    }
}

/// What listeners receive
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message(InboundMessage),
    Status(ConnectionStatus),
    Error(String),
}

/// Identifies one registration, for [`off`](crate::ConnectionManager::off)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<EventLabel, Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: EventLabel, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.entry(label).or_default().push((id, listener));
        id
    }

    /// Remove one registration; other listeners on the label are untouched
    pub fn remove(&mut self, label: &EventLabel, id: ListenerId) -> bool {
        let Some(entries) = self.listeners.get_mut(label) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(label);
        }
        removed
    }

    /// Registration-ordered callbacks for a label
    pub fn listeners_for(&self, label: &EventLabel) -> Vec<Listener> {
        self.listeners
            .get(label)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, label: &EventLabel) -> usize {
        self.listeners.get(label).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }
}

pub(crate) type SharedRegistry = Arc<RwLock<ListenerRegistry>>;

/// Deliver `event` to every listener of `label`
///
/// A panicking listener is logged and skipped.
pub(crate) fn emit(registry: &SharedRegistry, label: &EventLabel, event: &Event) {
    let listeners = registry.read().listeners_for(label);
    for listener in listeners {
        call_guarded("listener", || listener(event));
    }
}

/// Run user code, logging instead of unwinding into the manager
pub(crate) fn call_guarded(what: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(what, "User callback panicked, continuing");
    }
}

/// Handle returned by [`on`](crate::ConnectionManager::on)
///
/// Dropping it keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    label: EventLabel,
    id: ListenerId,
    registry: Weak<RwLock<ListenerRegistry>>,
}

impl Subscription {
    pub(crate) fn new(label: EventLabel, id: ListenerId, registry: &SharedRegistry) -> Self {
        Self {
            label,
            id,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn label(&self) -> &EventLabel {
        &self.label
    }

    /// Same as calling `off(label, id)` on the manager
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.write().remove(&self.label, self.id),
            None => false,
        }
    }
}
