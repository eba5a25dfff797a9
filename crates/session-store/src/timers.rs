//! Refresh timer ownership.
//!
//! Two timers exist per session: an expiry-aware one-shot ("smart") timer and a
//! fixed-interval background timer. Arming either replaces its predecessor.
//! Callbacks run on their own task, so cancelling or re-arming a timer from
//! inside its own callback never aborts the callback itself.

use parking_lot::Mutex;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// How long before expiry the smart timer fires.
pub const SMART_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Lower bound on any smart timer delay.
pub const SMART_REFRESH_FLOOR: Duration = Duration::from_secs(60);

/// Delay until the smart refresh for a token expiring at `expires_at_ms`.
pub fn smart_refresh_delay(expires_at_ms: i64, now_ms: i64) -> Duration {
    smart_refresh_delay_with(expires_at_ms, now_ms, SMART_REFRESH_MARGIN, SMART_REFRESH_FLOOR)
}

/// `max(expiry - now - margin, floor)`.
pub fn smart_refresh_delay_with(
    expires_at_ms: i64,
    now_ms: i64,
    margin: Duration,
    floor: Duration,
) -> Duration {
    let margin_ms = i64::try_from(margin.as_millis()).unwrap_or(i64::MAX);
    let floor_ms = i64::try_from(floor.as_millis()).unwrap_or(i64::MAX);
    let raw = expires_at_ms
        .saturating_sub(now_ms)
        .saturating_sub(margin_ms);
    Duration::from_millis(raw.max(floor_ms) as u64)
}

/// Holder of the two refresh timers for one session.
#[derive(Default)]
pub struct RefreshTimers {
    smart: Mutex<Option<JoinHandle<()>>>,
    interval: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the one-shot timer, cancelling any previous one.
    ///
    /// Errors from `callback` are logged and swallowed. Returns false when no
    /// tokio runtime is available.
    pub fn arm_smart<F, Fut, E>(&self, delay: Duration, callback: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime available, smart refresh not scheduled");
            return false;
        };

        let task = handle.clone().spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Smart refresh timer fired");
            handle.spawn(async move {
                if let Err(e) = callback().await {
                    warn!(error = %e, "Smart refresh failed");
                }
            });
        });

        if let Some(previous) = self.smart.lock().replace(task) {
            previous.abort();
        }
        debug!(delay_ms = delay.as_millis() as u64, "Smart refresh armed");
        true
    }

    /// Arm the fixed-interval timer, cancelling any previous one.
    ///
    /// The first tick happens one full `period` from now.
    pub fn arm_interval<F, Fut, E>(&self, period: Duration, callback: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        if period.is_zero() {
            warn!("Zero refresh period, interval refresh not scheduled");
            return false;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime available, interval refresh not scheduled");
            return false;
        };

        let task = handle.clone().spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Interval refresh timer fired");
                let fut = callback();
                handle.spawn(async move {
                    if let Err(e) = fut.await {
                        warn!(error = %e, "Interval refresh failed");
                    }
                });
            }
        });

        if let Some(previous) = self.interval.lock().replace(task) {
            previous.abort();
        }
        debug!(period_secs = period.as_secs(), "Interval refresh armed");
        true
    }

    pub fn cancel_smart(&self) {
        if let Some(task) = self.smart.lock().take() {
            task.abort();
        }
    }

    pub fn cancel_interval(&self) {
        if let Some(task) = self.interval.lock().take() {
            task.abort();
        }
    }

    /// Cancel both timers.
    pub fn cancel_all(&self) {
        self.cancel_smart();
        self.cancel_interval();
    }

    /// A smart timer is armed and has not fired yet.
    pub fn is_smart_armed(&self) -> bool {
        self.smart
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn is_interval_armed(&self) -> bool {
        self.interval
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for RefreshTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
