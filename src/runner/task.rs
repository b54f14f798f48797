use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::events::EventBus;

/// Body of a task, invoked repeatedly by every worker assigned to it.
///
/// Outcomes are reported by publishing `request_success`/`request_failure`
/// on the bus; the runner never inspects a return value.
#[async_trait]
pub trait TaskFn: Send + Sync {
    async fn call(&self, events: &EventBus);
}

/// Produces a task's current non-negative weight.
pub trait WeightFn: Send + Sync {
    fn weight(&self) -> u64;
}

impl<F> WeightFn for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn weight(&self) -> u64 {
        self()
    }
}

/// A named unit of work with a dynamically evaluated weight.
pub struct Task {
    name: String,
    weight_fn: Box<dyn WeightFn>,
    body: Box<dyn TaskFn>,
    weight: AtomicU64,
}

impl Task {
    pub fn new<W, B>(name: impl Into<String>, weight_fn: W, body: B) -> Self
    where
        W: WeightFn + 'static,
        B: TaskFn + 'static,
    {
        Self {
            name: name.into(),
            weight_fn: Box::new(weight_fn),
            body: Box::new(body),
            weight: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Weight seen by the last scheduling pass.
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.weight.load(Ordering::Relaxed)
    }

    pub(crate) fn refresh_weight(&self) -> u64 {
        let weight = self.weight_fn.weight();
        self.weight.store(weight, Ordering::Relaxed);
        weight
    }

    pub async fn call(&self, events: &EventBus) {
        self.body.call(events).await;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("weight", &self.weight())
            .finish_non_exhaustive()
    }
}
