//! Scoped timer handles
//!
//! Every piece of scheduled work (reconnect delay, batch flush, heartbeat,
//! the socket task itself) is a tokio task wrapped in a [`TaskGuard`].
//! Dropping the guard aborts the task, so clearing a field in the manager
//! state is enough to cancel the work, on every exit path.
//!
//! Each guard carries a unique id. A timer callback passes its id back to the
//! manager, which only acts if that id is still the armed one. This closes
//! the window between "timer fired" and "timer was cancelled".

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of an armed timer
pub type TimerId = u64;

/// Owned handle to a spawned task; aborts the task on drop
#[derive(Debug)]
pub struct TaskGuard {
    id: TimerId,
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    /// Reserve an id before the task exists, so the task can know it
    pub fn next_id() -> TimerId {
        NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed)
    }

    pub fn new(id: TimerId, handle: JoinHandle<()>) -> Self {
        Self {
            id,
            handle: Some(handle),
        }
    }

    /// Spawn `future` and guard it
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::new(Self::next_id(), tokio::spawn(future))
    }

    #[inline]
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Release the handle without aborting the task.
    ///
    /// Used by a timer that is tearing down its own guard while it runs.
    pub fn disarm(mut self) {
        self.handle.take();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Run `callback` once after `delay`
///
/// The callback receives the id of the returned guard.
pub fn after<F>(delay: Duration, callback: F) -> TaskGuard
where
    F: FnOnce(TimerId) + Send + 'static,
{
    let id = TaskGuard::next_id();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        callback(id);
    });
    TaskGuard::new(id, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let guard = after(Duration::from_millis(100), move |_| {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(guard.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let guard = after(Duration::from_millis(100), move |_| {
            flag.store(true, Ordering::SeqCst);
        });
        drop(guard);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_receives_guard_id() {
        let seen = Arc::new(AtomicU64::new(0));
        let slot = Arc::clone(&seen);
        let guard = after(Duration::from_millis(1), move |id| {
            slot.store(id, Ordering::SeqCst);
        });
        let expected = guard.id();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(seen.load(Ordering::SeqCst), expected);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let a = TaskGuard::spawn(async {});
        let b = TaskGuard::spawn(async {});
        assert_ne!(a.id(), b.id());
    }
}
