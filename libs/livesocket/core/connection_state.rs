//! Connection state and lock-free counters

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Logical connection state of a manager
///
/// Legal transitions:
///
/// ```text
/// Disconnected ─> Connecting ─> Connected ─> Disconnected ─> Reconnecting ─> Connected ...
///                     │                                          │
///                     └──────────────> Disconnected <────────────┘  (attempt failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    #[inline]
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True for both the first attempt and retries
    #[inline]
    pub fn is_connecting(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }

    #[inline]
    pub fn is_disconnected(self) -> bool {
        matches!(self, ConnectionState::Disconnected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub messages_dropped: u64,
    pub malformed_frames: u64,
    pub connection_state: ConnectionState,
}

/// Atomic counters updated from any task without taking the state lock
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
    messages_dropped: AtomicU64,
    malformed_frames: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, connection_state: ConnectionState) -> Metrics {
        Metrics {
            messages_sent: self.messages_sent(),
            messages_received: self.messages_received(),
            reconnect_count: self.reconnect_count(),
            messages_dropped: self.messages_dropped(),
            malformed_frames: self.malformed_frames(),
            connection_state,
        }
    }
}
