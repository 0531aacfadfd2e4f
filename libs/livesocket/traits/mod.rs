//! # LiveSocket Traits
//!
//! Core traits and types shared by the connection manager:
//!
//! - **WsMessage / Payload**: inbound frames and outbound payloads
//! - **Connector**: opens transport links (real socket or in-memory)
//! - **ReconnectionStrategy**: computes the delay before each retry
//! - **LiveSocketError**: the error taxonomy

pub mod error;
pub mod message;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{LiveSocketError, Result};
pub use message::{Payload, WsMessage};
pub use reconnect::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
pub use transport::{
    CloseFrame, Connector, Outbound, PendingLink, ReadyState, TransportEvent, TransportLink,
    CLOSE_ABNORMAL, CLOSE_NORMAL,
};
