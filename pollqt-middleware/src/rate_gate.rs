//! Local admission control for outbound requests.
//!
//! The gate admits at most `requests` callers per fixed window. Windows are aligned to
//! the gate's creation time and roll over on their own schedule, whether or not anyone
//! is waiting. A hold installed with [`RateGate::request_delay_until`] sits on top of
//! the window budget and blocks every caller until it expires.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pollqt_types::RateLimitConfig;
use tokio::time::Instant;

/// Shared admission gate. Wrap in `Arc` to share across request issuers.
pub struct RateGate {
    config: RateLimitConfig,
    runtime: Mutex<GateRuntime>,
}

struct GateRuntime {
    admitted_in_window: u32,
    window_start: Instant,
    hold_until: Option<Instant>,
}

impl RateGate {
    /// Create a gate whose first window starts now.
    ///
    /// A zero request budget is treated as one and a zero window as one millisecond.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let config = RateLimitConfig {
            requests: config.requests.max(1),
            window: config.window.max(Duration::from_millis(1)),
        };
        Self {
            config,
            runtime: Mutex::new(GateRuntime {
                admitted_in_window: 0,
                window_start: Instant::now(),
                hold_until: None,
            }),
        }
    }

    /// Effective configuration after normalization.
    #[must_use]
    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, GateRuntime> {
        // State stays consistent across a poisoning panic; keep gating.
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit the caller now or report the earliest instant worth retrying at.
    fn try_admit(&self) -> Result<(), Instant> {
        let mut rt = self.lock();
        let now = Instant::now();

        if let Some(until) = rt.hold_until {
            if now < until {
                return Err(until);
            }
            rt.hold_until = None;
        }

        let elapsed = now.duration_since(rt.window_start);
        if elapsed >= self.config.window {
            // Advance by whole windows so boundaries stay on the fixed schedule.
            let windows_passed = elapsed.as_nanos() / self.config.window.as_nanos();
            let boundary_offset = Duration::from_nanos(
                (windows_passed * self.config.window.as_nanos())
                    .try_into()
                    .unwrap_or(u64::MAX),
            );
            rt.window_start += boundary_offset;
            rt.admitted_in_window = 0;
        }

        if rt.admitted_in_window < self.config.requests {
            rt.admitted_in_window += 1;
            Ok(())
        } else {
            Err(rt.window_start + self.config.window)
        }
    }

    /// Suspend until both the window budget and any active hold allow passage.
    ///
    /// Returns how long the caller waited. Dropping the future while it waits
    /// consumes no budget.
    pub async fn wait_until_runnable(&self) -> Duration {
        let started = Instant::now();
        loop {
            match self.try_admit() {
                Ok(()) => break,
                Err(wake_at) => tokio::time::sleep_until(wake_at).await,
            }
        }
        let waited = started.elapsed();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            "rate gate admitted request"
        );
        waited
    }

    /// Block all passage until the wall-clock time `until`.
    ///
    /// No-op when `until` is not in the future. An earlier deadline never shortens a
    /// hold that is already active.
    pub fn request_delay_until(&self, until: DateTime<Utc>) {
        let now = Utc::now();
        if until <= now {
            #[cfg(feature = "tracing")]
            tracing::debug!(%until, "hold already expired; ignoring");
            return;
        }
        let delay = (until - now).to_std().unwrap_or_default();
        self.request_delay_for(delay);
    }

    /// Block all passage for `delay` from now.
    pub fn request_delay_for(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let until = Instant::now() + delay;
        let mut rt = self.lock();
        rt.hold_until = Some(rt.hold_until.map_or(until, |cur| cur.max(until)));
        drop(rt);
        #[cfg(feature = "tracing")]
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "holding all requests"
        );
    }

    /// Instant the active hold expires at, if any.
    #[must_use]
    pub fn hold_until(&self) -> Option<Instant> {
        let rt = self.lock();
        rt.hold_until.filter(|until| *until > Instant::now())
    }
}
