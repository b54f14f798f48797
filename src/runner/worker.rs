use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError};

use futures_util::FutureExt;
use tracing::{debug, error};

use crate::events::{EventBus, RequestFailure};

use super::rate::RateLimiter;
use super::state::{Assignment, StopToken};
use super::task::Task;

/// Everything one worker needs; cloned out of the runner at launch.
pub(super) struct WorkerSlot {
    pub(super) index: usize,
    pub(super) assignment: Assignment,
    pub(super) stop: StopToken,
    pub(super) limiter: Option<Arc<RateLimiter>>,
    pub(super) events: EventBus,
}

impl WorkerSlot {
    fn current_task(&self) -> Option<Arc<Task>> {
        self.assignment
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(self.index)
            .cloned()
    }
}

/// Repeatedly runs the task in this worker's slot until the generation stops.
///
/// The slot is re-read every iteration so weight re-syncs take effect
/// without restarting workers.
pub(super) async fn run_worker(mut slot: WorkerSlot) {
    loop {
        if slot.stop.is_stopped() {
            break;
        }
        let Some(task) = slot.current_task() else {
            break;
        };
        if let Some(limiter) = slot.limiter.as_ref() {
            let acquired = tokio::select! {
                acquired = limiter.acquire() => acquired,
                () = slot.stop.stopped() => break,
            };
            if !acquired {
                continue;
            }
        }
        safe_run(&task, &slot.events).await;
        tokio::task::yield_now().await;
    }
    debug!("Worker {} exited", slot.index);
}

/// Runs one invocation; a panic is logged and reported as a failure.
pub(super) async fn safe_run(task: &Task, events: &EventBus) {
    let outcome = AssertUnwindSafe(task.call(events)).catch_unwind().await;
    if let Err(payload) = outcome {
        let message = panic_message(payload.as_ref());
        error!("Task {} panicked: {}", task.name(), message);
        events
            .publish_failure(RequestFailure::new("unknown", "panic", 0, message))
            .await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_owned()
}
