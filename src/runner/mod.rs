//! Worker pool lifecycle: hatching, weighted task assignment, stopping,
//! and the command and reporting loops that talk to the coordinator.

mod alloc;
mod context;
mod rate;
mod state;
mod task;
mod worker;


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::coordinator::{
    CoordinatorCommand, CoordinatorReceiver, CoordinatorSender, StatsMessage, WorkerMessage,
};
use crate::error::{AppError, AppResult, CoordinatorError, ValidationError};
use crate::events::EventBus;
use crate::stats::StatsReport;

pub use alloc::allocate;
pub use context::RunnerContext;
pub use rate::RateLimiter;
pub use state::{HatchRequest, MAX_HATCH_CLIENTS, RunnerPhase};
pub use task::{Task, TaskFn, WeightFn};

use state::{Assignment, Generation, RunnerState, StopToken};
use worker::{WorkerSlot, run_worker};

/// Default interval between weight re-evaluations of a running generation.
pub const DEFAULT_WEIGHT_SYNC_INTERVAL: Duration = Duration::from_secs(120);
/// Pause between hatch batches.
const HATCH_BATCH_PAUSE: Duration = Duration::from_secs(1);

/// Per-process runner settings.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub node_id: String,
    pub weight_sync_interval: Duration,
}

impl RunnerSettings {
    #[must_use]
    pub const fn new(node_id: String) -> Self {
        Self {
            node_id,
            weight_sync_interval: DEFAULT_WEIGHT_SYNC_INTERVAL,
        }
    }
}

/// Launch parameters of one generation, moved into its background tasks.
struct Launch {
    id: u64,
    worker_count: usize,
    hatch_rate: usize,
    assignment: Assignment,
    stop: StopToken,
}

/// Owns the worker pool and its lifecycle.
///
/// Shared as `Arc<Runner>`: the command intake, the launch loop of the
/// current generation and the reporting loop all hold a reference.
pub struct Runner {
    tasks: Arc<[Arc<Task>]>,
    settings: RunnerSettings,
    num_clients: AtomicU64,
    state: Mutex<RunnerState>,
    context: RunnerContext,
    coordinator: CoordinatorSender,
}

impl Runner {
    /// # Errors
    ///
    /// Returns an error when `tasks` is empty.
    pub fn new(
        tasks: Vec<Task>,
        settings: RunnerSettings,
        context: RunnerContext,
        coordinator: CoordinatorSender,
    ) -> AppResult<Arc<Self>> {
        if tasks.is_empty() {
            return Err(AppError::validation(ValidationError::NoTasks));
        }
        let tasks: Arc<[Arc<Task>]> = tasks.into_iter().map(Arc::new).collect();
        Ok(Arc::new(Self {
            tasks,
            settings,
            num_clients: AtomicU64::new(0),
            state: Mutex::new(RunnerState::new()),
            context,
            coordinator,
        }))
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.settings.node_id
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.context.events
    }

    #[must_use]
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    #[must_use]
    pub fn phase(&self) -> RunnerPhase {
        self.lock_state().phase
    }

    /// Workers launched by the current generation.
    #[must_use]
    pub fn num_clients(&self) -> u64 {
        self.num_clients.load(Ordering::SeqCst)
    }

    /// Batch size of the most recent hatch.
    #[must_use]
    pub fn hatch_rate(&self) -> usize {
        self.lock_state().hatch_rate
    }

    fn lock_state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, message: WorkerMessage) -> AppResult<()> {
        self.coordinator.send(message)
    }

    fn node(&self) -> String {
        self.settings.node_id.clone()
    }

    /// Announces this worker and starts the reporting and quit loops.
    ///
    /// # Errors
    ///
    /// Returns an error when `client_ready` cannot be queued.
    pub fn get_ready(self: &Arc<Self>, reports: mpsc::Receiver<StatsReport>) -> AppResult<()> {
        self.spawn_quit_listener();
        self.send(WorkerMessage::ClientReady {
            node_id: self.node(),
        })?;
        info!("Worker {} ready", self.node_id());
        self.spawn_reporter(reports);
        Ok(())
    }

    fn spawn_reporter(self: &Arc<Self>, mut reports: mpsc::Receiver<StatsReport>) {
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(report) = reports.recv().await {
                let message = WorkerMessage::Stats {
                    node_id: runner.node(),
                    data: Box::new(StatsMessage::new(report, runner.num_clients())),
                };
                if runner.send(message).is_err() {
                    debug!("Coordinator link closed; stats reporting stopped");
                    break;
                }
            }
        });
    }

    fn spawn_quit_listener(self: &Arc<Self>) {
        let runner = Arc::clone(self);
        let mut quit_rx = self.context.events.subscribe_quit();
        tokio::spawn(async move {
            if quit_rx.recv().await.is_some() {
                runner.stop();
                if let Err(err) = runner.send(WorkerMessage::Quit {
                    node_id: runner.node(),
                }) {
                    warn!("Could not notify coordinator of quit: {}", err);
                }
            }
        });
    }

    /// Starts a new generation of `request.clients` workers.
    ///
    /// An active generation is cancelled first; starting from `Init` or
    /// `Stopped` clears the statistics instead.
    pub fn hatch(self: &Arc<Self>, request: HatchRequest) {
        let worker_count = request.clients.get();
        let hatch_rate = request.hatch_rate.get();
        let assignment: Assignment = Arc::new(RwLock::new(allocate(worker_count, &self.tasks)));

        let launch = {
            let mut state = self.lock_state();
            if state.phase.is_active() {
                if let Some(previous) = state.generation.take() {
                    previous.cancel();
                    debug!("Cancelled generation {}", previous.id);
                }
            } else {
                self.context.stats.clear();
            }
            state.generations_started = state.generations_started.saturating_add(1);
            let generation = Generation::new(state.generations_started);
            let next = Launch {
                id: generation.id,
                worker_count,
                hatch_rate,
                assignment,
                stop: generation.stop_token(),
            };
            state.generation = Some(generation);
            state.phase = RunnerPhase::Hatching;
            state.hatch_rate = hatch_rate;
            self.num_clients.store(0, Ordering::SeqCst);
            next
        };

        info!(
            "Hatching {} clients at the rate {} clients/s",
            worker_count, hatch_rate
        );
        let sync_assignment = Arc::clone(&launch.assignment);
        let sync_stop = launch.stop.clone();
        tokio::spawn(Arc::clone(self).launch_workers(launch));
        tokio::spawn(Arc::clone(self).sync_weights(worker_count, sync_assignment, sync_stop));
    }

    async fn launch_workers(self: Arc<Self>, mut launch: Launch) {
        for index in 0..launch.worker_count {
            let batch_done = index > 0 && index.checked_rem(launch.hatch_rate) == Some(0);
            if batch_done {
                tokio::select! {
                    () = tokio::time::sleep(HATCH_BATCH_PAUSE) => {}
                    () = launch.stop.stopped() => {
                        debug!("Generation {} cancelled while hatching", launch.id);
                        return;
                    }
                }
            }
            if !self.admit_worker(launch.id) {
                return;
            }
            let slot = WorkerSlot {
                index,
                assignment: Arc::clone(&launch.assignment),
                stop: launch.stop.clone(),
                limiter: self.context.limiter.clone(),
                events: self.context.events.clone(),
            };
            tokio::spawn(run_worker(slot));
        }
        self.hatch_complete(launch.id);
    }

    /// Counts one more worker if generation `id` is still current.
    fn admit_worker(&self, id: u64) -> bool {
        let state = self.lock_state();
        if !state.is_current(id) {
            return false;
        }
        self.num_clients.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn hatch_complete(&self, id: u64) {
        let count = {
            let mut state = self.lock_state();
            if !state.is_current(id) {
                return;
            }
            state.phase = RunnerPhase::Running;
            self.num_clients()
        };
        info!("Hatch complete, {} clients running", count);
        if let Err(err) = self.send(WorkerMessage::HatchComplete {
            node_id: self.node(),
            count,
        }) {
            warn!("Could not report hatch completion: {}", err);
        }
    }

    /// Re-evaluates weights on a fixed cadence for as long as the generation lives.
    async fn sync_weights(
        self: Arc<Self>,
        worker_count: usize,
        assignment: Assignment,
        mut stop: StopToken,
    ) {
        let period = self.settings.weight_sync_interval;
        if period.is_zero() {
            return;
        }
        let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut sync_tick = tokio::time::interval_at(start, period);
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = sync_tick.tick() => {}
                () = stop.stopped() => return,
            }
            let slots = allocate(worker_count, &self.tasks);
            *assignment.write().unwrap_or_else(PoisonError::into_inner) = slots;
            debug!("Re-synced weights for {} workers", worker_count);
        }
    }

    /// Cancels the current generation. Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        let mut state = self.lock_state();
        if !state.phase.is_active() {
            return false;
        }
        if let Some(generation) = state.generation.take() {
            generation.cancel();
        }
        state.phase = RunnerPhase::Stopped;
        info!("All workers stopped");
        true
    }

    /// Applies coordinator commands until `quit` arrives or the link closes.
    ///
    /// # Errors
    ///
    /// Returns an error when the command stream ends without a `quit`, or a
    /// reply cannot be queued.
    pub async fn serve(self: &Arc<Self>, mut commands: CoordinatorReceiver) -> AppResult<()> {
        while let Some(command) = commands.receive().await {
            match command {
                CoordinatorCommand::Hatch { data, .. } => {
                    match HatchRequest::new(data.num_clients, data.hatch_rate) {
                        Ok(request) => {
                            self.send(WorkerMessage::Hatching {
                                node_id: self.node(),
                            })?;
                            self.hatch(request);
                        }
                        Err(err) => warn!("Ignoring hatch: {}", err),
                    }
                }
                CoordinatorCommand::Stop { .. } => {
                    info!("Received stop from coordinator");
                    self.stop();
                    self.send(WorkerMessage::ClientStopped {
                        node_id: self.node(),
                    })?;
                    self.send(WorkerMessage::ClientReady {
                        node_id: self.node(),
                    })?;
                }
                CoordinatorCommand::Quit { .. } => {
                    info!("Received quit from coordinator");
                    self.stop();
                    return Ok(());
                }
            }
        }
        Err(AppError::coordinator(
            CoordinatorError::CoordinatorConnectionClosed,
        ))
    }
}
