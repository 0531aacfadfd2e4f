use thiserror::Error;

/// Main error type for livesocket
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveSocketError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The target address could not be turned into a connection request
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Inbound frame could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Outbound queue is at capacity, the message was dropped
    #[error("Outbound queue full ({capacity} messages), message dropped")]
    QueueFull { capacity: usize },

    /// Socket is not open and the message could not be queued
    #[error("Not connected and queueing is disabled")]
    NotConnected,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for livesocket operations
pub type Result<T> = std::result::Result<T, LiveSocketError>;
