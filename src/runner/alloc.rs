use std::sync::Arc;

use tracing::debug;

use super::task::Task;

/// Builds the per-worker task table for `worker_count` workers.
///
/// Each task's weight is re-evaluated first. Tasks receive
/// `round_half_up(worker_count * weight / total)` consecutive slots in list
/// order, capped at `worker_count`; with an all-zero total every task gets
/// `worker_count / tasks.len()`. Slots left over by rounding are handed out
/// round-robin from the first task. The result has exactly `worker_count`
/// entries unless `tasks` is empty.
#[must_use]
pub fn allocate(worker_count: usize, tasks: &[Arc<Task>]) -> Vec<Arc<Task>> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let weights: Vec<u64> = tasks.iter().map(|task| task.refresh_weight()).collect();
    let total: u128 = weights.iter().copied().map(u128::from).sum();

    let mut slots: Vec<Arc<Task>> = Vec::with_capacity(worker_count);
    for (task, weight) in tasks.iter().zip(weights) {
        let amount = if total == 0 {
            worker_count.checked_div(tasks.len()).unwrap_or(0)
        } else {
            proportional_share(worker_count, weight, total)
        };
        debug!(
            "Task {} weight {}/{} gets {} workers",
            task.name(),
            weight,
            total,
            amount
        );
        let room = worker_count.saturating_sub(slots.len());
        slots.extend(std::iter::repeat_n(Arc::clone(task), amount.min(room)));
    }

    let shortfall = worker_count.saturating_sub(slots.len());
    slots.extend(tasks.iter().cycle().take(shortfall).cloned());
    slots
}

/// `worker_count * weight / total`, rounded half up, without floats.
fn proportional_share(worker_count: usize, weight: u64, total: u128) -> usize {
    let workers = u128::try_from(worker_count).unwrap_or(u128::MAX);
    let numerator = workers
        .saturating_mul(u128::from(weight))
        .saturating_mul(2)
        .saturating_add(total);
    let share = numerator
        .checked_div(total.saturating_mul(2))
        .unwrap_or(0);
    usize::try_from(share).unwrap_or(usize::MAX)
}
