use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::events::EventBus;
use crate::stats::{StatsHandle, StatsPipeline, StatsReport, setup_stats_aggregator};

use super::rate::{RateLimiter, spawn_refill};

/// Shared services handed to the runner and, through it, to every worker.
///
/// Built once per process: the event bus, the running stats aggregator and,
/// when a ceiling is configured, the request limiter with its refill task.
#[derive(Clone)]
pub struct RunnerContext {
    pub events: EventBus,
    pub stats: StatsHandle,
    pub limiter: Option<Arc<RateLimiter>>,
}

impl RunnerContext {
    /// Starts the background services. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(
        max_rps: Option<NonZeroU64>,
        flush_interval: Duration,
    ) -> (Self, mpsc::Receiver<StatsReport>) {
        let events = EventBus::new();
        let StatsPipeline {
            handle, reports, ..
        } = setup_stats_aggregator(&events, flush_interval);
        let limiter = max_rps.map(|ceiling| {
            info!("Max RPS that swarmer may generate is limited to {}", ceiling);
            let limiter = Arc::new(RateLimiter::new(ceiling));
            drop(spawn_refill(Arc::clone(&limiter)));
            limiter
        });
        (
            Self {
                events,
                stats: handle,
                limiter,
            },
            reports,
        )
    }
}
