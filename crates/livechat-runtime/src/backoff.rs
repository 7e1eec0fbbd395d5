//! Reconnect backoff with optional jitter

use livechat_core::SessionConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential reconnect delay calculator
///
/// Attempts are unlimited: the session lives for the whole process, so the
/// driver keeps retrying at the capped delay until it is shut down.
#[derive(Clone, Debug)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            jitter: false,
            attempt: 0,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.reconnect_delay, config.max_reconnect_delay)
            .with_jitter(config.reconnect_jitter)
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the next reconnect attempt
    pub fn next_delay(&mut self) -> Duration {
        // min(base * 2^attempt, max)
        let base_ms = self.base_delay.as_millis();
        let max_ms = self.max_delay.as_millis();
        let multiplier = 1u128.checked_shl(self.attempt.min(63)).unwrap_or(u128::MAX);
        let capped_ms = base_ms.saturating_mul(multiplier).min(max_ms);
        let capped_ms = u64::try_from(capped_ms).unwrap_or(u64::MAX);

        // Equal jitter: never below half the capped delay
        let delay_ms = if self.jitter && capped_ms > 1 {
            let half = capped_ms / 2;
            half + rand::thread_rng().gen_range(0..=capped_ms - half)
        } else {
            capped_ms
        };

        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(delay_ms)
    }

    /// Start over from the base delay after a successful connect
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delays handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
