//! HTTP task bodies and wave-shaped weights built from test definitions.
mod http;
mod weight;

#[cfg(test)]
mod tests;

use std::time::Duration;

use reqwest::Client;

use crate::config::TestDefinition;
use crate::error::AppResult;
use crate::runner::Task;

pub use http::{HttpTask, MAX_BODY_BYTES};
pub use weight::WaveWeight;

/// Shared client for every HTTP task.
///
/// # Errors
///
/// Returns an error when the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration, max_idle_per_host: Option<usize>) -> AppResult<Client> {
    let mut builder = Client::builder().timeout(timeout);
    if let Some(max_idle) = max_idle_per_host {
        builder = builder.pool_max_idle_per_host(max_idle);
    }
    Ok(builder.build()?)
}

/// Turns each definition into a runnable task.
///
/// # Errors
///
/// Returns an error for the first definition with an invalid URL, method,
/// header or body size.
pub fn build_tasks(definitions: &[TestDefinition], client: &Client) -> AppResult<Vec<Task>> {
    definitions
        .iter()
        .map(|definition| {
            let body = HttpTask::from_definition(client.clone(), definition)?;
            Ok(Task::new(
                definition.task_name(),
                WaveWeight::from(definition.weight),
                body,
            ))
        })
        .collect()
}
