use rand::Rng;
use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// The manager decides *whether* to reconnect (attempt ceiling, intentional
/// close); the strategy only decides *how long* to wait.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the given reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (1-indexed: the first
    ///   retry after a failure is attempt 1)
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff with additive jitter
///
/// Delay for attempt `n` is `initial_delay * 2^(n-1) + jitter`, capped at
/// `max_delay`, where jitter is drawn uniformly from `[0, max_jitter)`.
/// The jitter desynchronizes many clients that lost the same server.
///
/// As long as `max_jitter <= initial_delay`, consecutive delays never
/// decrease.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - The delay before the first reconnect
    /// * `max_delay` - The maximum delay between reconnects
    /// * `max_jitter` - Upper bound (exclusive) of the random jitter
    pub fn new(initial_delay: Duration, max_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_jitter,
        }
    }

    /// Compute the delay for an attempt with an explicit jitter value
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        let base = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);

        base.saturating_add(jitter).min(self.max_delay)
    }

    fn sample_jitter(&self) -> Duration {
        let bound = self.max_jitter.as_nanos().min(u64::MAX as u128) as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..bound))
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        self.delay_with_jitter(attempt, self.sample_jitter())
    }
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}
