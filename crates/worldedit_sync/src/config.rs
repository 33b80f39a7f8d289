//! Configuration for remote synchronization.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Flush thresholds for the synchronizer.
///
/// Both thresholds are editor policy and are always supplied by the caller.
/// Delivery retries are configured on the transport, see [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// A flush happens once more than this many deltas are owed.
    pub max_new_local_changes: usize,
    /// A flush happens once more than this much time passed since the last one.
    pub max_time_since_last_upload: Duration,
}

impl SyncConfig {
    /// Creates a sync configuration.
    pub fn new(max_new_local_changes: usize, max_time_since_last_upload: Duration) -> Self {
        Self {
            max_new_local_changes,
            max_time_since_last_upload,
        }
    }

    /// Creates a configuration with the time threshold given in seconds.
    pub fn from_secs_f64(max_new_local_changes: usize, seconds: f64) -> SyncResult<Self> {
        let interval = Duration::try_from_secs_f64(seconds).map_err(|_| {
            SyncError::InvalidConfig(format!(
                "max time since last upload must be finite and non-negative, got {seconds}s"
            ))
        })?;
        Ok(Self::new(max_new_local_changes, interval))
    }

    /// Sets the change threshold.
    pub fn with_max_new_local_changes(mut self, max: usize) -> Self {
        self.max_new_local_changes = max;
        self
    }

    /// Sets the time threshold.
    pub fn with_max_time_since_last_upload(mut self, interval: Duration) -> Self {
        self.max_time_since_last_upload = interval;
        self
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of delivery attempts.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% on top.
            let jitter = delay_secs * 0.25 * jitter_fraction();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
