//! Common test utilities for LiveSocket integration tests
//!
//! - [`MockConnector`]: in-memory transport; the test plays the server
//!   through a [`MockPeer`] per connection attempt
//! - [`MockWsServer`]: a real echo WebSocket server on localhost
//! - [`SilentWsServer`]: completes the handshake, then never writes again
//! - [`Recorder`]: collects events delivered to listeners

#![allow(dead_code)]

use livesocket::{
    CloseFrame, Connector, Event, LiveSocketError, ManagerConfig, Outbound, PendingLink,
    TransportEvent, TransportLink, WsMessage,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Let spawned tasks run without moving the (paused) clock
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Defaults with jitter removed so backoff delays are exact
pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        reconnect_jitter: Duration::ZERO,
        ..ManagerConfig::default()
    }
}

// ============================================================================
// In-memory transport
// ============================================================================

/// What happens to a new connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptMode {
    /// Open immediately
    Accept,
    /// Fail the handshake immediately
    Refuse,
    /// Wait for `MockPeer::accept` / `MockPeer::refuse`
    Manual,
}

struct MockState {
    mode: AcceptMode,
    reject_sync: bool,
    attempt_times: Vec<Instant>,
    peers: Vec<Arc<MockPeer>>,
}

/// Server side of one connection attempt
pub struct MockPeer {
    pub index: usize,
    inbound: mpsc::UnboundedSender<TransportEvent>,
    decision: Mutex<Option<oneshot::Sender<bool>>>,
    sent: Arc<Mutex<Vec<Outbound>>>,
    link_closed: Arc<AtomicBool>,
}

impl MockPeer {
    pub fn accept(&self) {
        if let Some(tx) = self.decision.lock().take() {
            let _ = tx.send(true);
        }
    }

    pub fn refuse(&self) {
        if let Some(tx) = self.decision.lock().take() {
            let _ = tx.send(false);
        }
    }

    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self
            .inbound
            .send(TransportEvent::Message(WsMessage::Text(text.into())));
    }

    pub fn push_json(&self, value: Value) {
        self.push_text(value.to_string());
    }

    pub fn push_binary(&self, data: Vec<u8>) {
        let _ = self
            .inbound
            .send(TransportEvent::Message(WsMessage::Binary(data)));
    }

    pub fn error(&self, message: &str) {
        let _ = self.inbound.send(TransportEvent::Error(message.to_string()));
    }

    /// Server-initiated close
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self
            .inbound
            .send(TransportEvent::Closed(CloseFrame::new(code, reason)));
    }

    /// Everything the client wrote, in order
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|command| match command {
                Outbound::Frame(WsMessage::Text(text)) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn sent_json(&self) -> Vec<Value> {
        self.sent_texts()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    pub fn sent_of_type(&self, kind: &str) -> Vec<Value> {
        self.sent_json()
            .into_iter()
            .filter(|value| value["type"] == kind)
            .collect()
    }

    pub fn close_frames(&self) -> Vec<CloseFrame> {
        self.sent()
            .into_iter()
            .filter_map(|command| match command {
                Outbound::Close(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    /// True once the client dropped its end of the link
    pub fn link_closed(&self) -> bool {
        self.link_closed.load(Ordering::SeqCst)
    }
}

/// In-memory [`Connector`]; clone it to keep a control handle
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new(mode: AcceptMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                mode,
                reject_sync: false,
                attempt_times: Vec::new(),
                peers: Vec::new(),
            })),
        }
    }

    pub fn accepting() -> Self {
        Self::new(AcceptMode::Accept)
    }

    pub fn refusing() -> Self {
        Self::new(AcceptMode::Refuse)
    }

    pub fn manual() -> Self {
        Self::new(AcceptMode::Manual)
    }

    pub fn set_mode(&self, mode: AcceptMode) {
        self.state.lock().mode = mode;
    }

    /// Make `connect` fail before returning a future
    pub fn set_reject_sync(&self, reject: bool) {
        self.state.lock().reject_sync = reject;
    }

    /// Number of `connect` calls, including synchronously rejected ones
    pub fn attempts(&self) -> usize {
        self.state.lock().attempt_times.len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state.lock().attempt_times.clone()
    }

    /// Gaps between consecutive connect calls
    pub fn attempt_gaps(&self) -> Vec<Duration> {
        self.attempt_times()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }

    pub fn peer(&self, index: usize) -> Arc<MockPeer> {
        Arc::clone(&self.state.lock().peers[index])
    }

    pub fn latest(&self) -> Arc<MockPeer> {
        let state = self.state.lock();
        Arc::clone(state.peers.last().expect("no connection attempt yet"))
    }

    pub fn peer_count(&self) -> usize {
        self.state.lock().peers.len()
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &str) -> livesocket::Result<PendingLink> {
        let mut state = self.state.lock();
        state.attempt_times.push(Instant::now());
        if state.reject_sync {
            return Err(LiveSocketError::InvalidUrl {
                url: url.to_string(),
                reason: "rejected by mock".to_string(),
            });
        }

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (decision_tx, decision_rx) = oneshot::channel();

        let peer = Arc::new(MockPeer {
            index: state.peers.len(),
            inbound: inbound_tx.clone(),
            decision: Mutex::new(Some(decision_tx)),
            sent: Arc::new(Mutex::new(Vec::new())),
            link_closed: Arc::new(AtomicBool::new(false)),
        });
        state.peers.push(Arc::clone(&peer));
        match state.mode {
            AcceptMode::Accept => peer.accept(),
            AcceptMode::Refuse => peer.refuse(),
            AcceptMode::Manual => {}
        }

        let sent = Arc::clone(&peer.sent);
        let link_closed = Arc::clone(&peer.link_closed);

        Ok(Box::pin(async move {
            if !decision_rx.await.unwrap_or(false) {
                return Err(LiveSocketError::WebSocket("connection refused".to_string()));
            }

            // Record writes; answer a close frame like a well-behaved server
            tokio::spawn(async move {
                while let Some(command) = outbound_rx.recv().await {
                    let echo = match &command {
                        Outbound::Close(frame) => Some(frame.clone()),
                        Outbound::Frame(_) => None,
                    };
                    sent.lock().push(command);
                    if let Some(frame) = echo {
                        let _ = inbound_tx.send(TransportEvent::Closed(frame));
                    }
                }
                link_closed.store(true, Ordering::SeqCst);
            });

            Ok(TransportLink {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        }))
    }
}

// ============================================================================
// Event recording
// ============================================================================

/// Shared log of delivered events
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener closure appending to this log
    pub fn listener(&self) -> impl Fn(&Event) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &Event| events.lock().push(event.clone())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn statuses(&self) -> Vec<livesocket::ConnectionStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn message_types(&self) -> Vec<Option<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Message(message) => Some(message.kind),
                _ => None,
            })
            .collect()
    }
}

/// Counter usable from hooks and listeners
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Real WebSocket server
// ============================================================================

/// A simple echo WebSocket server for testing the tungstenite transport
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    kick: Arc<Notify>,
    connections: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let kick = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));

        let shutdown_clone = Arc::clone(&shutdown);
        let kick_clone = Arc::clone(&kick);
        let connections_clone = Arc::clone(&connections);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                connections_clone.fetch_add(1, Ordering::SeqCst);
                                let shutdown = Arc::clone(&shutdown_clone);
                                let kick = Arc::clone(&kick_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown, kick).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            kick,
            connections,
        }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, shutdown: Arc<Notify>, kick: Arc<Notify>) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
        use tokio_tungstenite::tungstenite::protocol::CloseFrame as WireCloseFrame;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                // Complete the closing handshake
                                let _ = write.close().await;
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = kick.notified() => {
                    let frame = WireCloseFrame {
                        code: CloseCode::Away,
                        reason: "going away".into(),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    break;
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of accepted TCP connections so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Close every open connection with 1001, keep accepting
    pub fn kick_clients(&self) {
        self.kick.notify_waiters();
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Silent server
// ============================================================================

/// Accepts one client, answers the WebSocket handshake by hand and then
/// stays silent: no frames, no close reply. Tracks when the client's TCP
/// connection goes away.
pub struct SilentWsServer {
    addr: SocketAddr,
    client_gone: Arc<AtomicBool>,
}

impl SilentWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client_gone = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&client_gone);

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if Self::handshake(&mut stream).await.is_none() {
                return;
            }

            // Swallow whatever the client writes until it hangs up
            let mut buf = [0u8; 1024];
            let mut received = 0;
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => received += n,
                }
            }
            verbose_println!("silent server: client gone after {} bytes", received);
            flag.store(true, Ordering::SeqCst);
        });

        Self { addr, client_gone }
    }

    async fn handshake(stream: &mut TcpStream) -> Option<()> {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.ok()?;
            if n == 0 {
                return None;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let request = String::from_utf8_lossy(&request);
        let key = request.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("sec-websocket-key")
                .then(|| value.trim().to_string())
        })?;

        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\r\n",
            derive_accept_key(key.as_bytes())
        );
        stream.write_all(response.as_bytes()).await.ok()
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait up to `limit` (real time) for the client to drop its connection
    pub async fn wait_client_gone(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if self.client_gone.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.client_gone.load(Ordering::SeqCst)
    }
}
