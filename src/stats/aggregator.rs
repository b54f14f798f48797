use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::events::EventBus;

use super::report::StatsReport;
use super::request_stats::RequestStats;

/// Cadence at which snapshots are taken and forwarded to the runner.
pub const STATS_FLUSH_INTERVAL: Duration = Duration::from_secs(3);
/// Pending success/failure records buffered per channel before publishers wait.
pub const OUTCOME_QUEUE_DEPTH: usize = 1000;
/// Snapshots buffered between the aggregator and the reporting loop.
pub const REPORT_QUEUE_DEPTH: usize = 100;

/// Sending side of the aggregator's clear channel.
#[derive(Clone, Debug)]
pub struct StatsHandle {
    clear_tx: mpsc::UnboundedSender<()>,
}

impl StatsHandle {
    /// Ask the aggregator to drop all accumulated statistics.
    pub fn clear(&self) {
        if self.clear_tx.send(()).is_err() {
            debug!("Stats aggregator already stopped; clear ignored");
        }
    }
}

/// Handles produced when the aggregator is started.
pub struct StatsPipeline {
    pub handle: StatsHandle,
    pub reports: mpsc::Receiver<StatsReport>,
    pub task: JoinHandle<()>,
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Applies every clear queued so far.
///
/// Clears queued before a record was published must land before that record
/// is logged.
fn apply_pending_clears(clear_rx: &mut mpsc::UnboundedReceiver<()>, stats: &mut RequestStats) {
    let mut cleared = false;
    while clear_rx.try_recv().is_ok() {
        cleared = true;
    }
    if cleared {
        stats.clear_all(unix_now());
    }
}

/// Spawns the aggregator task.
///
/// It subscribes to success and failure events on `events` and serially
/// drains them together with clear signals and the flush timer, so the
/// statistics need no lock. It stops once every [`StatsHandle`] is dropped
/// or the report receiver goes away.
#[must_use]
pub fn setup_stats_aggregator(events: &EventBus, flush_interval: Duration) -> StatsPipeline {
    let mut success_rx = events.subscribe_success(OUTCOME_QUEUE_DEPTH);
    let mut failure_rx = events.subscribe_failure(OUTCOME_QUEUE_DEPTH);
    let (clear_tx, mut clear_rx) = mpsc::unbounded_channel::<()>();
    let (report_tx, report_rx) = mpsc::channel::<StatsReport>(REPORT_QUEUE_DEPTH);

    let task = tokio::spawn(async move {
        let mut stats = RequestStats::new(unix_now());
        let first_flush = Instant::now()
            .checked_add(flush_interval)
            .unwrap_or_else(Instant::now);
        let mut flush = tokio::time::interval_at(first_flush, flush_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(success) = success_rx.recv() => {
                    apply_pending_clears(&mut clear_rx, &mut stats);
                    stats.log_request(&success, unix_now());
                }
                Some(failure) = failure_rx.recv() => {
                    apply_pending_clears(&mut clear_rx, &mut stats);
                    stats.log_error(&failure, unix_now());
                }
                clear = clear_rx.recv() => {
                    match clear {
                        Some(()) => stats.clear_all(unix_now()),
                        None => break,
                    }
                }
                _ = flush.tick() => {
                    apply_pending_clears(&mut clear_rx, &mut stats);
                    let report = stats.snapshot(unix_now());
                    // No network I/O here; the runner's reporting loop sends it on.
                    if report_tx.send(report).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Stats aggregator stopped");
    });

    StatsPipeline {
        handle: StatsHandle { clear_tx },
        reports: report_rx,
        task,
    }
}
