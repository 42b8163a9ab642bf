use std::time::Duration;

use pollqt_types::{BackoffConfig, PollError};
use rand::Rng;

/// Add up to `jitter_percent` percent of random delay on top of `base_ms`.
#[must_use]
pub fn jitter_wait(base_ms: u64, jitter_percent: u32) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, (base_ms.saturating_mul(u64::from(jitter_percent))) / 100)
    };
    let mut rng = rand::rng();
    base_ms + rng.random_range(0..jitter_range)
}

/// Exponential retry schedule with a retry budget.
///
/// Delay for attempt `n >= 1` is `min(base * 2^(n-1), max)`; before the first failure
/// the delay is zero. Once `max_attempts` retries have been handed out the next
/// [`advance`](Self::advance) fails with `RetriesExhausted`.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u8,
}

impl Backoff {
    /// Fresh schedule at attempt zero.
    #[must_use]
    pub fn new(cfg: BackoffConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: cfg.max_retries,
            base_ms: cfg.base_delay_ms,
            max_ms: cfg.max_delay_ms,
            jitter_percent: cfg.jitter_percent.min(100),
        }
    }

    /// Number of failures recorded so far.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// True once every retry in the budget has been handed out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Deterministic delay for the current attempt count. Does not mutate.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms_for(self.attempt))
    }

    /// Record a failure and return how long to wait before retrying.
    ///
    /// # Errors
    /// Returns `PollError::RetriesExhausted` when the retry budget is already spent.
    pub fn advance(&mut self) -> Result<Duration, PollError> {
        if self.is_exhausted() {
            return Err(PollError::RetriesExhausted {
                attempts: self.attempt,
            });
        }
        self.attempt += 1;
        let ms = self.delay_ms_for(self.attempt);
        let ms = if self.jitter_percent == 0 {
            ms
        } else {
            jitter_wait(ms, u32::from(self.jitter_percent)).min(self.max_ms)
        };
        Ok(Duration::from_millis(ms))
    }

    /// Return to attempt zero.
    pub const fn reset(&mut self) {
        self.attempt = 0;
    }

    fn delay_ms_for(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }
        let factor = 2u64.saturating_pow(attempt - 1);
        self.base_ms.saturating_mul(factor).min(self.max_ms)
    }
}
