use crate::traits::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_RECONNECT_INTERVAL: Duration = Duration::from_millis(30_000);
const DEFAULT_RECONNECT_JITTER: Duration = Duration::from_millis(1000);
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);
const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager)
///
/// Every field has a default, so a YAML document only needs the keys it
/// changes. Durations are written in milliseconds:
///
/// ```yaml
/// max_reconnect_attempts: 5
/// reconnect_interval_ms: 1000
/// max_reconnect_interval_ms: 10000
/// heartbeat_interval_ms: 15000
/// enable_batching: true
/// batch_max_size: 20
/// ```
///
/// The configuration is checked once by [`validate`](Self::validate) when the
/// manager is built and never re-interpreted afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Reconnect attempts allowed after a failure (None = unlimited)
    pub max_reconnect_attempts: Option<u32>,

    /// Base backoff delay
    #[serde(rename = "reconnect_interval_ms", with = "duration_ms")]
    pub reconnect_interval: Duration,

    /// Backoff ceiling
    #[serde(rename = "max_reconnect_interval_ms", with = "duration_ms")]
    pub max_reconnect_interval: Duration,

    /// Upper bound of the random jitter added to each backoff delay
    #[serde(rename = "reconnect_jitter_ms", with = "duration_ms")]
    pub reconnect_jitter: Duration,

    /// Time between heartbeat pings while connected
    #[serde(rename = "heartbeat_interval_ms", with = "duration_ms")]
    pub heartbeat_interval: Duration,

    /// Tear the socket down when a ping stays unanswered this long.
    /// None keeps the send-only heartbeat.
    #[serde(rename = "pong_timeout_ms", with = "option_duration_ms")]
    pub pong_timeout: Option<Duration>,

    /// Queue sends while disconnected
    pub enable_queue: bool,

    /// Queue capacity; sends beyond it are dropped
    pub max_queue_size: usize,

    /// Coalesce sends into `batch` envelopes while connected
    pub enable_batching: bool,

    /// How long a batch accumulates before it is flushed
    #[serde(rename = "batch_interval_ms", with = "duration_ms")]
    pub batch_interval: Duration,

    /// Flush as soon as a batch holds this many payloads
    pub batch_max_size: Option<usize>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: None,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_interval: DEFAULT_MAX_RECONNECT_INTERVAL,
            reconnect_jitter: DEFAULT_RECONNECT_JITTER,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            pong_timeout: None,
            enable_queue: true,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            enable_batching: false,
            batch_interval: DEFAULT_BATCH_INTERVAL,
            batch_max_size: None,
        }
    }
}

impl ManagerConfig {
    /// Check the invariants the manager relies on
    pub fn validate(&self) -> Result<()> {
        if self.reconnect_interval.is_zero() {
            return Err(invalid("reconnect_interval must be greater than zero"));
        }
        if self.max_reconnect_interval < self.reconnect_interval {
            return Err(invalid(
                "max_reconnect_interval must not be smaller than reconnect_interval",
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(invalid("heartbeat_interval must be greater than zero"));
        }
        if self.batch_interval.is_zero() {
            return Err(invalid("batch_interval must be greater than zero"));
        }
        if self.enable_queue && self.max_queue_size == 0 {
            return Err(invalid(
                "max_queue_size must be greater than zero when the queue is enabled",
            ));
        }
        if self.batch_max_size == Some(0) {
            return Err(invalid("batch_max_size must be greater than zero"));
        }
        if matches!(self.pong_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(invalid("pong_timeout must be greater than zero"));
        }
        Ok(())
    }

    /// The default strategy built from the backoff fields
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.reconnect_interval,
            self.max_reconnect_interval,
            self.reconnect_jitter,
        )
    }

    /// True once `attempts` reached the configured ceiling
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_reconnect_attempts
            .map_or(false, |max| attempts >= max)
    }
}

fn invalid(reason: &str) -> LiveSocketError {
    LiveSocketError::Configuration(reason.to_string())
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
