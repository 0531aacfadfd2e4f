//! Transport seam
//!
//! The manager never talks to a socket directly. A [`Connector`] opens a
//! link and hands back two channels:
//!
//! ```text
//!   ConnectionManager ──Outbound──> [outbound tx] ──> writer ──> socket
//!   ConnectionManager <─TransportEvent── [inbound rx] <── reader <── socket
//! ```
//!
//! A production connector wraps tokio-tungstenite; tests plug in an
//! in-memory connector and play the server themselves.

use crate::traits::error::Result;
use crate::traits::message::WsMessage;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

/// Close code used when a connection attempt fails before opening
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Close code sent by [`close`](crate::ConnectionManager::close) by default
pub const CLOSE_NORMAL: u16 = 1000;

/// Raw ready-state of a socket handle, mirroring the browser WebSocket API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Code and reason carried by a close event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Commands flowing from the manager to the socket writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write one data frame
    Frame(WsMessage),
    /// Send a close frame and stop writing
    Close(CloseFrame),
}

/// Events flowing from the socket reader to the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A data frame arrived
    Message(WsMessage),
    /// The transport reported an error; a `Closed` event follows
    Error(String),
    /// The socket is gone
    Closed(CloseFrame),
}

/// An open socket, as seen by the manager
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Future resolving once the socket is open (or failed to open)
pub type PendingLink = BoxFuture<'static, Result<TransportLink>>;

/// Opens transport links
///
/// `connect` has two failure points on purpose:
/// * `Err` returned synchronously - the request could not even be built
///   (bad URL). The manager treats this as a failed attempt and schedules a
///   reconnect without emitting error/close events.
/// * `Err` from the returned future - the handshake failed. The manager
///   surfaces it as an error event followed by an abnormal close.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &str) -> Result<PendingLink>;
}
