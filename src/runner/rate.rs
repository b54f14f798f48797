use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Aggregate request ceiling shared by every worker.
///
/// A single atomic permit counter is reset to the ceiling once per second;
/// workers that find it exhausted park on a broadcast wake-up instead of
/// spinning.
#[derive(Debug)]
pub struct RateLimiter {
    ceiling: i64,
    permits: AtomicI64,
    refilled: Notify,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_rps: NonZeroU64) -> Self {
        let ceiling = i64::try_from(max_rps.get()).unwrap_or(i64::MAX);
        Self {
            ceiling,
            permits: AtomicI64::new(ceiling),
            refilled: Notify::new(),
        }
    }

    #[must_use]
    pub fn ceiling(&self) -> u64 {
        u64::try_from(self.ceiling).unwrap_or(0)
    }

    /// Takes one permit; `false` means the ceiling is used up for this second.
    pub fn try_acquire(&self) -> bool {
        self.permits.fetch_sub(1, Ordering::AcqRel) > 0
    }

    /// Takes one permit, or waits for the next refill when none are left.
    ///
    /// Returns `false` after a wait: the caller should re-check its stop
    /// signal and try again.
    pub async fn acquire(&self) -> bool {
        let refilled = self.refilled.notified();
        tokio::pin!(refilled);
        refilled.as_mut().enable();
        if self.try_acquire() {
            return true;
        }
        refilled.await;
        false
    }

    /// Resets the permits to the ceiling and wakes every parked worker.
    pub fn refill(&self) {
        self.permits.store(self.ceiling, Ordering::Release);
        self.refilled.notify_waiters();
    }
}

pub(crate) fn spawn_refill(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let first = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut refill_tick = interval_at(first, period);
        refill_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            refill_tick.tick().await;
            limiter.refill();
        }
    })
}
