//! PONG Response Tracker
//!
//! Opt-in liveness check for the heartbeat. A connection is considered dead
//! when the oldest unanswered PING is older than the configured timeout.
//!
//! Timestamps are stored as milliseconds since an internal epoch, offset by
//! one so that zero means "never".

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub struct PongTracker {
    /// Epoch time when tracking started (for converting Instant to u64)
    epoch: Instant,
    /// Oldest unanswered PING (ms since epoch + 1, 0 = none outstanding)
    outstanding_ping_ms: AtomicU64,
    /// Last PONG received (ms since epoch + 1, 0 = never)
    last_pong_received_ms: AtomicU64,
    /// If no PONG arrives within this duration after a PING, the link is dead
    timeout: Duration,
}

impl PongTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            outstanding_ping_ms: AtomicU64::new(0),
            last_pong_received_ms: AtomicU64::new(0),
            timeout,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64 + 1
    }

    /// Record that a PING was just sent
    ///
    /// Only the first PING of an unanswered run is kept; later pings do not
    /// push the deadline out.
    pub fn record_ping_sent(&self) {
        let _ = self.outstanding_ping_ms.compare_exchange(
            0,
            self.now_ms(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Record that a PONG was just received
    pub fn record_pong_received(&self) {
        self.last_pong_received_ms
            .store(self.now_ms(), Ordering::Release);
        self.outstanding_ping_ms.store(0, Ordering::Release);
    }

    /// Check if the connection appears healthy
    ///
    /// Returns false only if a PING has been waiting for its PONG for at
    /// least the timeout.
    pub fn is_healthy(&self) -> bool {
        let ping_ms = self.outstanding_ping_ms.load(Ordering::Acquire);
        if ping_ms == 0 {
            return true;
        }
        let since_ping_ms = self.now_ms().saturating_sub(ping_ms);
        since_ping_ms < self.timeout.as_millis() as u64
    }

    /// Get time since last PONG was received
    ///
    /// Returns None if no PONG has ever been received.
    pub fn time_since_last_pong(&self) -> Option<Duration> {
        let pong_ms = self.last_pong_received_ms.load(Ordering::Acquire);
        if pong_ms == 0 {
            return None;
        }
        Some(Duration::from_millis(self.now_ms().saturating_sub(pong_ms)))
    }

    /// Reset the tracker state
    ///
    /// Called on every successful open.
    pub fn reset(&self) {
        self.outstanding_ping_ms.store(0, Ordering::Release);
        self.last_pong_received_ms.store(0, Ordering::Release);
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
