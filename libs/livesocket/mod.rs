//! # LiveSocket
//!
//! A resilient WebSocket connection manager for keeping an application in
//! sync with a backend push service.
//!
//! ## Features
//!
//! - **Automatic reconnection**: exponential backoff with jitter, optional attempt ceiling
//! - **Heartbeat**: periodic JSON pings, optional pong timeout
//! - **Outbound queue**: bounded FIFO while disconnected, flushed on open
//! - **Batching**: optional coalescing of sends into one `batch` envelope
//! - **Typed fan-out**: listeners per message type, status, error, or wildcard
//! - **Deterministic teardown**: every timer is a handle that aborts on drop
//!
//! ## Example
//!
//! ```rust,ignore
//! use livesocket::{EventLabel, Event};
//!
//! let manager = livesocket::builder()
//!     .url("wss://push.example.com/ws")
//!     .on_reconnect(|attempt| tracing::info!(attempt, "Reconnecting"))
//!     .build()?;
//!
//! let sub = manager.on("loan_status_change", |event| {
//!     if let Event::Message(msg) = event {
//!         println!("{}", msg.payload);
//!     }
//! });
//!
//! manager.send(serde_json::json!({"type": "get_loan_stats"}))?;
//! sub.unsubscribe();
//! manager.close();
//! ```

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use crate::core::{
    builder, config, connection_state, envelope, listeners, manager,
    builder::{states, ConnectionManagerBuilder},
    config::ManagerConfig,
    connection_state::{AtomicMetrics, ConnectionState, Metrics},
    listeners::{ConnectionStatus, Event, EventLabel, InboundMessage, ListenerId, Subscription},
    manager::{
        ConnectionManager, Delivery, SendOptions, StateSnapshot, CLOSE_HEARTBEAT_TIMEOUT,
    },
    pong_tracker::PongTracker,
    tungstenite::TungsteniteConnector,
};

// Convenience function
pub use crate::core::builder as client_builder;
