//! Request pacing: how long to wait before attempts, between retries and
//! between pages.
//!
//! The crawler only ever waits at these points, and every wait can be cut
//! short by cancellation. [`Pacer`] decides the length of each wait so tests
//! can swap the randomised production timings for zero-length ones.

use crate::config::{CrawlConfig, DelayRange};
use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// The points at which the crawler waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Short jitter before every HTTP attempt.
    BeforeAttempt,
    /// Wait after the `attempt`-th failed attempt (1-based).
    Backoff { attempt: u32 },
    /// Longer wait before requesting the next listing page.
    BetweenPages,
}

/// Decides how long each [`Pause`] lasts.
pub trait Pacer {
    fn delay_for(&self, pause: Pause) -> Duration;
}

/// Production pacing: uniform jitter for attempts and pages, linear backoff
/// for retries (`attempt × backoff_step`).
#[derive(Debug, Clone)]
pub struct JitterPacer {
    attempt_delay: DelayRange,
    page_delay: DelayRange,
    backoff_step: Duration,
}

impl JitterPacer {
    pub fn new(attempt_delay: DelayRange, page_delay: DelayRange, backoff_step: Duration) -> Self {
        Self {
            attempt_delay,
            page_delay,
            backoff_step,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.attempt_delay, config.page_delay, config.backoff_step)
    }

    fn uniform(range: DelayRange) -> Duration {
        if range.max_secs <= range.min_secs {
            return Duration::from_secs_f64(range.min_secs);
        }
        Duration::from_secs_f64(rng().random_range(range.min_secs..=range.max_secs))
    }
}

impl Pacer for JitterPacer {
    fn delay_for(&self, pause: Pause) -> Duration {
        match pause {
            Pause::BeforeAttempt => Self::uniform(self.attempt_delay),
            Pause::Backoff { attempt } => self.backoff_step.saturating_mul(attempt),
            Pause::BetweenPages => Self::uniform(self.page_delay),
        }
    }
}

impl<P: Pacer + ?Sized> Pacer for &P {
    fn delay_for(&self, pause: Pause) -> Duration {
        (**self).delay_for(pause)
    }
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `false` when the wait was cancelled (or the token was already
/// cancelled), `true` when the full duration elapsed.
pub async fn wait(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}
