//! Heartbeat mechanism for WebSocket connections
//!
//! # Architecture
//!
//! The heartbeat runs in a dedicated Tokio task, armed on every successful
//! open and dropped (aborted) on close:
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │  (TaskGuard)        │
//! │                     │
//! │  Every interval:    │
//! │  1. Wait for tick   │
//! │  2. on_tick() ──────┼──> ConnectionManager::heartbeat_tick ──> {"type":"ping"} ──> socket
//! │  3. Stop if false   │
//! └─────────────────────┘
//! ```
//!
//! The ping is written straight to the transport. It is never queued (a
//! queued ping means the link is already down) and never batched.

use super::timer::TaskGuard;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Spawn a heartbeat task
///
/// The first tick happens one full `interval` after spawning. `on_tick`
/// returns `false` once the connection it belongs to is gone, which ends
/// the task.
pub fn spawn_heartbeat<F>(interval: Duration, mut on_tick: F) -> TaskGuard
where
    F: FnMut() -> bool + Send + 'static,
{
    TaskGuard::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        // If we miss ticks due to a stalled runtime, skip them rather than bursting
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Heartbeat task started with interval: {:?}", interval);

        loop {
            ticker.tick().await;
            if !on_tick() {
                break;
            }
        }

        debug!("Heartbeat task exiting");
    })
}
