//! Configuration types for pushflow operations

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bounds for [`crate::stream::range`] when the caller has no preference
pub const DEFAULT_RANGE: (i64, i64, i64) = (0, 100, 1);

/// Default bounds for [`crate::stream::random`]
pub const DEFAULT_RANDOM_BOUNDS: (i64, i64) = (0, 100);

/// Retry and timeout policy for a fallible asynchronous operation.
///
/// `retries` is the number of additional attempts made after a failure;
/// there is no delay between attempts. `timeout` is a single deadline that
/// covers every attempt; `Duration::ZERO` disables it.
///
/// Serialized as `{"retries": 2, "timeout": 1.5}` with the timeout in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RetryPolicy {
    pub retries: u32,
    #[serde(with = "seconds")]
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, timeout: Duration) -> Self {
        Self { retries, timeout }
    }

    /// Set the number of retries after a failed attempt
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the overall deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_timeout(&self) -> bool {
        !self.timeout.is_zero()
    }
}

/// Windowed rate limit: at most `allowed_through` elements per `window`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub allowed_through: usize,
    #[serde(with = "seconds")]
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            allowed_through: 10,
            window: Duration::from_secs(1),
        }
    }
}

impl ThrottleConfig {
    pub fn new(allowed_through: usize, window: Duration) -> Self {
        Self {
            allowed_through,
            window,
        }
    }
}

/// Limits for the message framing reassembly buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Largest payload accepted between two sentinels
    pub max_frame_len: usize,
    /// Size of each read from the underlying byte channel
    pub read_chunk_size: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_frame_len: 16 * 1024 * 1024, // 16MB
            read_chunk_size: 8192,
        }
    }
}

impl FramingConfig {
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size.max(1);
        self
    }
}

/// (De)serialize a `Duration` as fractional seconds
mod seconds {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(D::Error::custom(format!(
                "duration must be a non-negative number of seconds, got {}",
                secs
            )));
        }
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
