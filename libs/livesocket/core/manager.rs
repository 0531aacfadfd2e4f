//! The connection manager
//!
//! # Architecture
//!
//! ```text
//!                        ┌──────────────────────────────┐
//!  send/close/on ──────> │ Inner                        │
//!                        │  state: Mutex<Shared>        │
//!                        │   ├ connection_state         │
//!                        │   ├ socket (generation N)    │──Outbound──> transport
//!                        │   ├ queue / batch            │
//!                        │   └ heartbeat/reconnect/     │
//!                        │     batch TaskGuards         │
//!                        └──────────────────────────────┘
//!                            ▲         ▲          ▲
//!                            │ Weak    │ Weak     │ Weak
//!                   socket task   heartbeat   reconnect / batch timers
//! ```
//!
//! Every entry point (caller call, transport event, timer) runs as a short
//! critical section under the state lock. The lock is never held across an
//! `.await` nor while hooks or listeners run.
//!
//! Each connection attempt gets a new generation number. Transport events and
//! heartbeat ticks carry the generation they belong to and are ignored once
//! a newer socket replaced theirs.

use super::config::ManagerConfig;
use super::connection_state::{AtomicMetrics, ConnectionState, Metrics};
use super::envelope;
use super::heartbeat::spawn_heartbeat;
use super::listeners::{
    call_guarded, emit, ConnectionStatus, Event, EventLabel, InboundMessage, ListenerId,
    ListenerRegistry, SharedRegistry, Subscription,
};
use super::pong_tracker::PongTracker;
use super::queue::{BatchBuffer, OutboundQueue};
use super::timer::{self, TaskGuard, TimerId};
use crate::traits::*;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Close code used when the pong timeout tears a socket down
pub const CLOSE_HEARTBEAT_TIMEOUT: u16 = 4000;

const DEFAULT_CLOSE_REASON: &str = "Client closing connection";

// ============================================================================
// Hooks
// ============================================================================

pub type OpenHook = Arc<dyn Fn() + Send + Sync>;
pub type CloseHook = Arc<dyn Fn(&CloseFrame) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&str) + Send + Sync>;
pub type ReconnectHook = Arc<dyn Fn(u32) + Send + Sync>;
pub type MessageHook = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Optional lifecycle callbacks, set once through the builder
#[derive(Clone, Default)]
pub struct Hooks {
    pub on_open: Option<OpenHook>,
    pub on_close: Option<CloseHook>,
    pub on_error: Option<ErrorHook>,
    pub on_reconnect: Option<ReconnectHook>,
    pub on_message: Option<MessageHook>,
}

// ============================================================================
// Public value types
// ============================================================================

/// How a successful [`send`](ConnectionManager::send) was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the open socket
    Sent,
    /// Added to the current batch
    Batched,
    /// Held in the outbound queue until the next open
    Queued,
}

/// Per-call overrides for [`send_with`](ConnectionManager::send_with)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Fail instead of queueing while disconnected
    pub skip_queue: bool,
    /// Send immediately even when batching is enabled
    pub skip_batch: bool,
}

/// Point-in-time view of the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub connection_state: ConnectionState,
    /// Ready-state of the current socket, None when there is none
    pub ready_state: Option<ReadyState>,
    pub reconnect_attempts: u32,
    pub queue_length: usize,
    pub batch_length: usize,
    pub is_connected: bool,
}

// ============================================================================
// Internal state
// ============================================================================

struct Socket {
    generation: u64,
    ready_state: ReadyState,
    /// Set once the transport reports the socket open
    outbound: Option<UnboundedSender<Outbound>>,
    /// Drives the transport; dropping it abandons the socket
    _task: TaskGuard,
}

impl Socket {
    fn writer(&self) -> Option<&UnboundedSender<Outbound>> {
        match self.ready_state {
            ReadyState::Open => self.outbound.as_ref().filter(|tx| !tx.is_closed()),
            _ => None,
        }
    }
}

struct Shared {
    connection_state: ConnectionState,
    socket: Option<Socket>,
    generation: u64,
    reconnect_attempts: u32,
    intentional_close: bool,
    queue: OutboundQueue,
    batch: BatchBuffer,
    heartbeat: Option<TaskGuard>,
    reconnect_timer: Option<TaskGuard>,
    batch_timer: Option<TaskGuard>,
    /// Resource name -> number of subscribers
    resources: BTreeMap<String, usize>,
}

impl Shared {
    fn current_socket(&self, generation: u64) -> Option<&Socket> {
        self.socket.as_ref().filter(|s| s.generation == generation)
    }

    fn is_writable(&self) -> bool {
        self.socket.as_ref().and_then(Socket::writer).is_some()
    }

    /// Write one text frame to the open socket
    fn write_text(&self, text: String) -> bool {
        match self.socket.as_ref().and_then(Socket::writer) {
            Some(tx) => tx.send(Outbound::Frame(WsMessage::Text(text))).is_ok(),
            None => false,
        }
    }
}

struct Inner {
    url: String,
    config: ManagerConfig,
    connector: Arc<dyn Connector>,
    strategy: Box<dyn ReconnectionStrategy>,
    hooks: Hooks,
    listeners: SharedRegistry,
    state: Mutex<Shared>,
    metrics: AtomicMetrics,
    pong_tracker: Option<PongTracker>,
    weak_self: Weak<Inner>,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owns one logical WebSocket connection
///
/// Cloning is cheap and yields another handle to the same connection. When
/// the last handle is dropped every timer is cancelled and the socket is
/// released.
///
/// Construct with [`ConnectionManager::new`] or [`crate::builder`]; both
/// start connecting immediately and need a running tokio runtime.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Connect to `url` over tokio-tungstenite with `config`
    pub fn new(url: impl Into<String>, config: ManagerConfig) -> Result<Self> {
        super::builder().url(url).config(config).build()
    }

    /// Called by the builder once everything is validated
    pub(crate) fn start(
        url: String,
        config: ManagerConfig,
        connector: Arc<dyn Connector>,
        strategy: Box<dyn ReconnectionStrategy>,
        hooks: Hooks,
        resources: Vec<String>,
    ) -> Self {
        let mut subscribed = BTreeMap::new();
        for resource in resources {
            *subscribed.entry(resource).or_insert(0) += 1;
        }

        let pong_tracker = config.pong_timeout.map(PongTracker::new);
        let queue = OutboundQueue::new(config.max_queue_size);

        let inner = Arc::new_cyclic(|weak_self| Inner {
            url,
            config,
            connector,
            strategy,
            hooks,
            listeners: Arc::new(RwLock::new(ListenerRegistry::new())),
            state: Mutex::new(Shared {
                connection_state: ConnectionState::Disconnected,
                socket: None,
                generation: 0,
                reconnect_attempts: 0,
                intentional_close: false,
                queue,
                batch: BatchBuffer::new(),
                heartbeat: None,
                reconnect_timer: None,
                batch_timer: None,
                resources: subscribed,
            }),
            metrics: AtomicMetrics::new(),
            pong_tracker,
            weak_self: weak_self.clone(),
        });

        inner.connect();
        Self { inner }
    }

    /// Open the socket unless one is already connecting or open
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Send a payload, default options
    pub fn send(&self, payload: impl Into<Payload>) -> Result<Delivery> {
        self.send_with(payload, SendOptions::default())
    }

    /// Send a payload
    ///
    /// # Arguments
    /// * `payload` - text, or a JSON value serialized once here
    /// * `options` - per-call queue/batch overrides
    ///
    /// # Errors
    /// * [`LiveSocketError::QueueFull`] - disconnected and the queue is at capacity
    /// * [`LiveSocketError::NotConnected`] - disconnected and queueing is off or skipped
    /// * [`LiveSocketError::ConnectionClosed`] - the transport went away during the call
    pub fn send_with(&self, payload: impl Into<Payload>, options: SendOptions) -> Result<Delivery> {
        let inner = &self.inner;
        let text = payload.into().into_text();
        let mut shared = inner.state.lock();

        if shared.connection_state.is_connected() && shared.is_writable() {
            if inner.config.enable_batching && !options.skip_batch {
                let len = shared.batch.push(text);
                let full = inner.config.batch_max_size.is_some_and(|max| len >= max);
                if full {
                    inner.flush_batch_locked(&mut shared);
                } else if shared.batch_timer.is_none() {
                    shared.batch_timer = Some(inner.arm_batch_timer());
                }
                return Ok(Delivery::Batched);
            }

            return if inner.write(&shared, text) {
                Ok(Delivery::Sent)
            } else {
                Err(LiveSocketError::ConnectionClosed(
                    "transport closed during send".to_string(),
                ))
            };
        }

        if inner.config.enable_queue && !options.skip_queue {
            return match shared.queue.push(text) {
                Ok(len) => {
                    debug!(queue_length = len, "Queued message while disconnected");
                    Ok(Delivery::Queued)
                }
                Err(_dropped) => {
                    inner.metrics.increment_dropped();
                    let capacity = shared.queue.capacity();
                    warn!(capacity, "Outbound queue full, dropping message");
                    Err(LiveSocketError::QueueFull { capacity })
                }
            };
        }

        Err(LiveSocketError::NotConnected)
    }

    /// Send the pending batch now instead of waiting for the batch timer
    pub fn flush_batch(&self) {
        let mut shared = self.inner.state.lock();
        self.inner.flush_batch_locked(&mut shared);
    }

    /// Close with code 1000 and stop reconnecting
    pub fn close(&self) {
        self.close_with(CLOSE_NORMAL, DEFAULT_CLOSE_REASON);
    }

    /// Close with a custom code and reason and stop reconnecting
    ///
    /// Cancels the heartbeat, reconnect and batch timers. An open socket is
    /// sent a close frame; the `disconnected` status follows once the
    /// transport confirms. A socket still connecting is abandoned.
    pub fn close_with(&self, code: u16, reason: impl Into<String>) {
        let reason = reason.into();
        let mut shared = self.inner.state.lock();

        shared.intentional_close = true;
        shared.heartbeat = None;
        shared.reconnect_timer = None;
        shared.batch_timer = None;

        let mut abandon = false;
        if let Some(socket) = shared.socket.as_mut() {
            match socket.ready_state {
                ReadyState::Open => {
                    if let Some(tx) = &socket.outbound {
                        let _ = tx.send(Outbound::Close(CloseFrame::new(code, reason.clone())));
                    }
                    socket.ready_state = ReadyState::Closing;
                }
                ReadyState::Connecting => abandon = true,
                ReadyState::Closing | ReadyState::Closed => {}
            }
        }
        if abandon {
            shared.socket = None;
        }

        shared.connection_state = ConnectionState::Disconnected;
        info!(code, reason = %reason, "Closing connection to {}", self.inner.url);
    }

    /// Close, then start over with a fresh attempt counter
    pub fn reconnect(&self) {
        self.close();
        {
            let mut shared = self.inner.state.lock();
            shared.intentional_close = false;
            shared.reconnect_attempts = 0;
        }
        self.inner.connect();
    }

    /// Register a listener
    ///
    /// `label` is `"connection"`, `"error"`, `"*"`, a message type, or an
    /// [`EventLabel`].
    pub fn on<F>(&self, label: impl Into<EventLabel>, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let label = label.into();
        let id = self.inner.listeners.write().add(label.clone(), Arc::new(listener));
        Subscription::new(label, id, &self.inner.listeners)
    }

    /// Remove one listener; returns false if it was not registered
    pub fn off(&self, label: &EventLabel, id: ListenerId) -> bool {
        self.inner.listeners.write().remove(label, id)
    }

    /// Number of listeners registered for `label`
    pub fn listener_count(&self, label: &EventLabel) -> usize {
        self.inner.listeners.read().count(label)
    }

    /// Subscribe to a server-side resource
    ///
    /// The first subscriber sends a `subscribe` envelope if connected.
    /// Subscribed resources are replayed after every open.
    pub fn subscribe_resource(&self, resource: impl Into<String>) {
        let resource = resource.into();
        let mut shared = self.inner.state.lock();
        let first = {
            let count = shared.resources.entry(resource.clone()).or_insert(0);
            *count += 1;
            *count == 1
        };
        if first && self.inner.write(&shared, envelope::subscribe(&resource)) {
            debug!(resource = %resource, "Subscribed");
        }
    }

    /// Drop one subscription to a resource
    ///
    /// The last unsubscribe sends an `unsubscribe` envelope if connected.
    /// Returns false if the resource was not subscribed.
    pub fn unsubscribe_resource(&self, resource: &str) -> bool {
        let mut shared = self.inner.state.lock();
        let last = match shared.resources.get_mut(resource) {
            Some(count) => {
                *count -= 1;
                *count == 0
            }
            None => return false,
        };
        if last {
            shared.resources.remove(resource);
            if self.inner.write(&shared, envelope::unsubscribe(resource)) {
                debug!(resource, "Unsubscribed");
            }
        }
        true
    }

    /// Currently subscribed resources, sorted
    pub fn resources(&self) -> Vec<String> {
        self.inner.state.lock().resources.keys().cloned().collect()
    }

    pub fn state(&self) -> StateSnapshot {
        let shared = self.inner.state.lock();
        StateSnapshot {
            connection_state: shared.connection_state,
            ready_state: shared.socket.as_ref().map(|s| s.ready_state),
            reconnect_attempts: shared.reconnect_attempts,
            queue_length: shared.queue.len(),
            batch_length: shared.batch.len(),
            is_connected: shared.connection_state.is_connected(),
        }
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection_state
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    pub fn metrics(&self) -> Metrics {
        self.inner.metrics.snapshot(self.connection_state())
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Event handling
// ============================================================================

impl Inner {
    fn connect(&self) {
        let mut shared = self.state.lock();

        if let Some(socket) = &shared.socket {
            if matches!(socket.ready_state, ReadyState::Connecting | ReadyState::Open) {
                debug!("connect() ignored, socket is {:?}", socket.ready_state);
                return;
            }
        }

        shared.reconnect_timer = None;
        shared.connection_state = if shared.reconnect_attempts > 0 {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        };
        shared.generation += 1;
        let generation = shared.generation;

        match self.connector.connect(&self.url) {
            Ok(pending) => {
                debug!(generation, "Connecting to {}", self.url);
                let task = TaskGuard::spawn(run_transport(self.weak_self.clone(), generation, pending));
                shared.socket = Some(Socket {
                    generation,
                    ready_state: ReadyState::Connecting,
                    outbound: None,
                    _task: task,
                });
            }
            Err(e) => {
                error!("Failed to create connection to {}: {}", self.url, e);
                shared.socket = None;
                shared.connection_state = ConnectionState::Disconnected;
                drop(shared);
                self.schedule_reconnect();
            }
        }
    }

    fn handle_open(&self, generation: u64, outbound: UnboundedSender<Outbound>) {
        {
            let mut shared = self.state.lock();
            let Some(socket) = shared.socket.as_mut().filter(|s| s.generation == generation) else {
                let _ = outbound.send(Outbound::Close(CloseFrame::new(CLOSE_NORMAL, "superseded")));
                return;
            };
            socket.ready_state = ReadyState::Open;
            socket.outbound = Some(outbound);

            shared.connection_state = ConnectionState::Connected;
            shared.reconnect_attempts = 0;
            if let Some(tracker) = &self.pong_tracker {
                tracker.reset();
            }
            shared.heartbeat = Some(self.start_heartbeat(generation));

            // A batch kept across the outage predates anything queued since
            self.flush_batch_locked(&mut shared);
            let flushed = self.flush_queue(&mut shared);
            if flushed > 0 {
                debug!(flushed, "Flushed queued messages");
            }
            for resource in shared.resources.keys() {
                if shared.write_text(envelope::subscribe(resource)) {
                    self.metrics.increment_sent();
                }
            }
        }

        info!("Connected to {}", self.url);
        if let Some(hook) = &self.hooks.on_open {
            call_guarded("on_open", || hook());
        }
        emit(
            &self.listeners,
            &EventLabel::Connection,
            &Event::Status(ConnectionStatus::Connected),
        );
    }

    fn handle_message(&self, generation: u64, frame: WsMessage) {
        if self.state.lock().current_socket(generation).is_none() {
            return;
        }
        self.metrics.increment_received();

        let message = match envelope::decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                self.metrics.increment_malformed();
                warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        if envelope::is_pong(&message) {
            if let Some(tracker) = &self.pong_tracker {
                tracker.record_pong_received();
            }
            debug!("Received pong");
            return;
        }

        if let Some(hook) = &self.hooks.on_message {
            call_guarded("on_message", || hook(&message));
        }

        let typed = message.kind.clone().map(EventLabel::Type);
        let event = Event::Message(message);
        if let Some(label) = typed {
            emit(&self.listeners, &label, &event);
        }
        emit(&self.listeners, &EventLabel::All, &event);
    }

    fn handle_error(&self, generation: u64, err: &str) {
        if self.state.lock().current_socket(generation).is_none() {
            return;
        }
        error!("WebSocket error on {}: {}", self.url, err);
        if let Some(hook) = &self.hooks.on_error {
            call_guarded("on_error", || hook(err));
        }
        emit(&self.listeners, &EventLabel::Error, &Event::Error(err.to_string()));
    }

    fn handle_close(&self, generation: u64, frame: CloseFrame) {
        let intentional = {
            let mut shared = self.state.lock();
            if shared.current_socket(generation).is_none() {
                return;
            }
            shared.socket = None;
            shared.heartbeat = None;
            shared.connection_state = ConnectionState::Disconnected;
            shared.intentional_close
        };

        if intentional {
            info!(code = frame.code, reason = %frame.reason, "Connection closed");
        } else {
            warn!(code = frame.code, reason = %frame.reason, "Connection lost");
        }

        if let Some(hook) = &self.hooks.on_close {
            call_guarded("on_close", || hook(&frame));
        }
        emit(
            &self.listeners,
            &EventLabel::Connection,
            &Event::Status(ConnectionStatus::Disconnected {
                code: frame.code,
                reason: frame.reason,
            }),
        );

        if !intentional {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&self) {
        let (attempt, delay) = {
            let mut shared = self.state.lock();
            // Re-read here: a close hook or listener may have called close()
            if shared.intentional_close {
                debug!("Reconnect skipped, connection was closed intentionally");
                return;
            }
            if self.config.attempts_exhausted(shared.reconnect_attempts) {
                let attempts = shared.reconnect_attempts;
                drop(shared);
                error!(attempts, "Max reconnection attempts reached for {}", self.url);
                emit(
                    &self.listeners,
                    &EventLabel::Connection,
                    &Event::Status(ConnectionStatus::Failed { attempts }),
                );
                return;
            }

            shared.reconnect_attempts += 1;
            let attempt = shared.reconnect_attempts;
            let delay = self.strategy.next_delay(attempt);
            let weak = self.weak_self.clone();
            shared.reconnect_timer = Some(timer::after(delay, move |id| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_reconnect_timer(id);
                }
            }));
            (attempt, delay)
        };

        self.metrics.increment_reconnects();
        info!("Reconnecting in {:?} (attempt {})", delay, attempt);
    }

    fn on_reconnect_timer(&self, id: TimerId) {
        let attempt = {
            let mut shared = self.state.lock();
            match shared.reconnect_timer.take() {
                Some(timer) if timer.id() == id => timer.disarm(),
                other => {
                    shared.reconnect_timer = other;
                    return;
                }
            }
            shared.reconnect_attempts
        };
        if let Some(hook) = &self.hooks.on_reconnect {
            call_guarded("on_reconnect", || hook(attempt));
        }
        if self.state.lock().intentional_close {
            return;
        }
        self.connect();
    }

    // ========================================================================
    // Heartbeat
    // ========================================================================

    fn start_heartbeat(&self, generation: u64) -> TaskGuard {
        let weak = self.weak_self.clone();
        spawn_heartbeat(self.config.heartbeat_interval, move || match weak.upgrade() {
            Some(inner) => inner.heartbeat_tick(generation),
            None => false,
        })
    }

    /// One heartbeat period; false stops the heartbeat task
    fn heartbeat_tick(&self, generation: u64) -> bool {
        if let Some(tracker) = &self.pong_tracker {
            if !tracker.is_healthy() {
                warn!(
                    timeout = ?tracker.timeout(),
                    "No pong received in time, dropping connection"
                );
                let frame = CloseFrame::new(CLOSE_HEARTBEAT_TIMEOUT, "heartbeat timeout");
                {
                    let shared = self.state.lock();
                    if let Some(tx) = shared.current_socket(generation).and_then(Socket::writer) {
                        let _ = tx.send(Outbound::Close(frame.clone()));
                    }
                }
                self.handle_close(generation, frame);
                return false;
            }
        }

        let shared = self.state.lock();
        if shared.current_socket(generation).is_none() || !shared.connection_state.is_connected() {
            return false;
        }
        if self.write(&shared, envelope::ping()) {
            if let Some(tracker) = &self.pong_tracker {
                tracker.record_ping_sent();
            }
            debug!("Sent heartbeat ping");
        }
        true
    }

    // ========================================================================
    // Outbound helpers (called with the state lock held)
    // ========================================================================

    fn write(&self, shared: &Shared, text: String) -> bool {
        let written = shared.write_text(text);
        if written {
            self.metrics.increment_sent();
        }
        written
    }

    /// Oldest first; stops as soon as the socket is no longer writable
    fn flush_queue(&self, shared: &mut Shared) -> u64 {
        let mut flushed = 0;
        while shared.is_writable() {
            let Some(message) = shared.queue.pop_front() else {
                break;
            };
            if !shared.write_text(message) {
                break;
            }
            flushed += 1;
        }
        self.metrics.add_sent(flushed);
        flushed
    }

    fn arm_batch_timer(&self) -> TaskGuard {
        let weak = self.weak_self.clone();
        timer::after(self.config.batch_interval, move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.on_batch_timer(id);
            }
        })
    }

    fn on_batch_timer(&self, id: TimerId) {
        let mut shared = self.state.lock();
        match shared.batch_timer.take() {
            Some(timer) if timer.id() == id => timer.disarm(),
            other => {
                shared.batch_timer = other;
                return;
            }
        }
        self.flush_batch_locked(&mut shared);
    }

    /// Send the batch as one envelope if the socket is open; always clears the timer
    fn flush_batch_locked(&self, shared: &mut Shared) {
        shared.batch_timer = None;
        if shared.batch.is_empty() || !shared.is_writable() {
            return;
        }
        let messages = shared.batch.drain();
        if self.write(shared, envelope::batch(&messages)) {
            debug!(count = messages.len(), "Flushed batch");
        }
    }
}

// ============================================================================
// Transport task
// ============================================================================

/// Drive one socket from handshake to close
async fn run_transport(manager: Weak<Inner>, generation: u64, pending: PendingLink) {
    let TransportLink {
        outbound,
        mut inbound,
    } = match pending.await {
        Ok(link) => link,
        Err(e) => {
            if let Some(inner) = manager.upgrade() {
                let reason = e.to_string();
                inner.handle_error(generation, &reason);
                inner.handle_close(generation, CloseFrame::new(CLOSE_ABNORMAL, reason));
            }
            return;
        }
    };

    match manager.upgrade() {
        Some(inner) => inner.handle_open(generation, outbound),
        None => return,
    }

    while let Some(event) = inbound.recv().await {
        let Some(inner) = manager.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Message(frame) => inner.handle_message(generation, frame),
            TransportEvent::Error(err) => inner.handle_error(generation, &err),
            TransportEvent::Closed(frame) => {
                inner.handle_close(generation, frame);
                return;
            }
        }
    }

    if let Some(inner) = manager.upgrade() {
        inner.handle_close(generation, CloseFrame::new(CLOSE_ABNORMAL, "transport ended"));
    }
}
