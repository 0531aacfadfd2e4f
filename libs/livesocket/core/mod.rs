//! # LiveSocket core
//!
//! The connection manager and the pieces it is assembled from:
//!
//! - **manager**: connection lifecycle, send path, fan-out
//! - **builder**: type-state construction
//! - **config**: validated, YAML-loadable settings
//! - **timer / heartbeat / pong_tracker**: scheduled work as drop-to-cancel handles
//! - **queue**: outbound queue and batch buffer
//! - **listeners**: typed listener registry
//! - **envelope**: JSON wire envelopes
//! - **tungstenite**: the production transport
//!
//! ## Example
//!
//! ```rust,ignore
//! let manager = livesocket::builder()
//!     .url("wss://push.example.com/ws")
//!     .max_reconnect_attempts(5)
//!     .subscription("loans")
//!     .build()?;
//!
//! manager.on("connection", |event| println!("{:?}", event));
//! ```

pub mod builder;
pub mod config;
pub mod connection_state;
pub mod envelope;
pub mod heartbeat;
pub mod listeners;
pub mod manager;
pub mod pong_tracker;
pub mod queue;
pub mod timer;
pub mod tungstenite;

// Re-export main types
pub use builder::{states, ConnectionManagerBuilder};
pub use config::ManagerConfig;
pub use connection_state::{AtomicMetrics, ConnectionState, Metrics};
pub use listeners::{ConnectionStatus, Event, EventLabel, InboundMessage, ListenerId, Subscription};
pub use manager::{ConnectionManager, Delivery, SendOptions, StateSnapshot, CLOSE_HEARTBEAT_TIMEOUT};
pub use pong_tracker::PongTracker;
pub use tungstenite::TungsteniteConnector;

/// Create a new connection manager builder
///
/// # Example
/// ```ignore
/// let manager = livesocket::builder()
///     .url("ws://localhost:3001/ws")
///     .on_open(|| tracing::info!("connected"))
///     .build()?;
/// ```
pub fn builder() -> ConnectionManagerBuilder<builder::states::NoUrl> {
    ConnectionManagerBuilder::new()
}
