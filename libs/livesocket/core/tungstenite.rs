//! tokio-tungstenite transport
//!
//! Each open socket is split into two tasks:
//!
//! ```text
//!  manager ──Outbound──> writer task ──> SplitSink   ──> server
//!  manager <─TransportEvent── reader task <── SplitStream <── server
//! ```
//!
//! The writer stops after sending a close frame or when the manager drops
//! its sender. The reader finishes with exactly one `Closed` event, or
//! silently once the manager drops its receiver. The TCP stream is released
//! when both tasks are done.

use crate::traits::*;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as TungsteniteCloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the peer closed without a status code
const CLOSE_NO_STATUS: u16 = 1005;

/// Production [`Connector`] backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TungsteniteConnector {
    fn connect(&self, url: &str) -> Result<PendingLink> {
        // Building the request validates the URL before anything is spawned
        let request =
            url.into_client_request()
                .map_err(|e| LiveSocketError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        let url = url.to_string();

        Ok(Box::pin(async move {
            let (stream, _response) = connect_async(request)
                .await
                .map_err(|e| LiveSocketError::WebSocket(e.to_string()))?;
            debug!("WebSocket handshake with {} complete", url);

            let (write, read) = stream.split();
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

            tokio::spawn(write_loop(write, outbound_rx));
            tokio::spawn(read_loop(read, inbound_tx));

            Ok(TransportLink {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        }))
    }
}

async fn write_loop(
    mut write: SplitSink<Stream, Message>,
    mut commands: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Outbound::Frame(frame) => {
                if let Err(e) = write.send(to_tungstenite(frame)).await {
                    warn!("Failed to write frame: {}", e);
                    return;
                }
            }
            Outbound::Close(frame) => {
                let close = TungsteniteCloseFrame {
                    code: CloseCode::from(frame.code),
                    reason: Cow::Owned(frame.reason),
                };
                if let Err(e) = write.send(Message::Close(Some(close))).await {
                    debug!("Failed to write close frame: {}", e);
                }
                return;
            }
        }
    }

    // Manager dropped the socket without an explicit close
    let _ = write.close().await;
}

async fn read_loop(mut read: SplitStream<Stream>, events: mpsc::UnboundedSender<TransportEvent>) {
    let closed = loop {
        let next = tokio::select! {
            next = read.next() => next,
            // The manager dropped the link; release this half of the socket
            _ = events.closed() => {
                debug!("Link dropped, stopping reader");
                return;
            }
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                if events.send(TransportEvent::Message(WsMessage::Text(text))).is_err() {
                    return;
                }
            }
            Some(Ok(Message::Binary(data))) => {
                if events.send(TransportEvent::Message(WsMessage::Binary(data))).is_err() {
                    return;
                }
            }
            // Control frames are answered by tungstenite itself
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                break match frame {
                    Some(frame) => CloseFrame::new(u16::from(frame.code), frame.reason.into_owned()),
                    None => CloseFrame::new(CLOSE_NO_STATUS, ""),
                };
            }
            Some(Err(e)) => {
                error!("WebSocket error: {}", e);
                let _ = events.send(TransportEvent::Error(e.to_string()));
                break CloseFrame::new(CLOSE_ABNORMAL, e.to_string());
            }
            None => break CloseFrame::new(CLOSE_ABNORMAL, "stream ended"),
        }
    };

    let _ = events.send(TransportEvent::Closed(closed));
}

fn to_tungstenite(frame: WsMessage) -> Message {
    match frame {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}
