use clap::Parser;
use tracing::{info, warn};

use crate::args::WorkerArgs;
use crate::config::load_definitions;
use crate::coordinator;
use crate::error::{AppError, AppResult, ValidationError};
use crate::events::EventBus;
use crate::runner::{Runner, RunnerContext, RunnerSettings, Task};
use crate::stats::{OUTCOME_QUEUE_DEPTH, STATS_FLUSH_INTERVAL};
use crate::system::logger::init_logging;
use crate::system::node_id::generate_node_id;
use crate::system::signals::{setup_signal_shutdown_handler, shutdown_channel};
use crate::workload::{build_client, build_tasks};

/// Parses the command line, starts logging and the runtime, and runs the worker.
///
/// # Errors
///
/// Returns an error when the test definitions are unusable, the coordinator
/// cannot be reached, or the coordinator link drops unexpectedly.
pub fn run() -> AppResult<()> {
    let args = WorkerArgs::parse();
    init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args))
}

async fn run_async(args: WorkerArgs) -> AppResult<()> {
    let definitions = load_definitions(&args.test_definitions)?;
    let client = build_client(args.request_timeout(), args.max_idle_connections)?;
    let tasks = build_tasks(&definitions, &client)?;
    if tasks.is_empty() {
        return Err(AppError::validation(ValidationError::NoTasks));
    }

    if !args.run_tasks.is_empty() {
        return run_tasks_once(&tasks, &args.run_tasks).await;
    }
    run_worker(&args, tasks).await
}

/// Debug mode: runs each named task a single time and logs what it published.
async fn run_tasks_once(tasks: &[Task], names: &[String]) -> AppResult<()> {
    let events = EventBus::new();
    let mut successes = events.subscribe_success(OUTCOME_QUEUE_DEPTH);
    let mut failures = events.subscribe_failure(OUTCOME_QUEUE_DEPTH);

    for name in names {
        let task = tasks
            .iter()
            .find(|task| task.name() == name.as_str())
            .ok_or_else(|| {
                AppError::validation(ValidationError::UnknownTask { name: name.clone() })
            })?;
        info!("Running task {}", task.name());
        task.call(&events).await;

        while let Ok(success) = successes.try_recv() {
            info!(
                "{} {} succeeded in {} ms ({} bytes)",
                success.method, success.name, success.timings.elapsed_ms, success.content_length
            );
        }
        while let Ok(failure) = failures.try_recv() {
            warn!(
                "{} {} failed after {} ms: {}",
                failure.method, failure.name, failure.elapsed_ms, failure.error
            );
        }
    }
    Ok(())
}

async fn run_worker(args: &WorkerArgs, tasks: Vec<Task>) -> AppResult<()> {
    let node_id = args.node_id.clone().unwrap_or_else(generate_node_id);
    let (sender, receiver) = coordinator::connect(&args.coordinator_addr()).await?;

    let (context, reports) = RunnerContext::start(args.max_rps(), STATS_FLUSH_INTERVAL);
    let mut settings = RunnerSettings::new(node_id);
    settings.weight_sync_interval = args.weight_sync_interval();
    let runner = Runner::new(tasks, settings, context, sender.clone())?;
    runner.get_ready(reports)?;

    let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
    let signal_task = setup_signal_shutdown_handler(&shutdown_tx);

    let outcome = tokio::select! {
        served = runner.serve(receiver) => served,
        _ = shutdown_rx.recv() => {
            runner.events().publish_quit().await;
            let quit_timeout = args.quit_timeout();
            if tokio::time::timeout(quit_timeout, sender.wait_disconnected())
                .await
                .is_err()
            {
                warn!(
                    "Coordinator link still open after {} ms; exiting anyway",
                    quit_timeout.as_millis()
                );
            }
            Ok(())
        }
    };

    signal_task.abort();
    info!("Worker {} shutting down", runner.node_id());
    outcome
}
