use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::error::ValidationError;

use super::task::Task;

/// Lifecycle phase of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Init,
    Hatching,
    Running,
    Stopped,
}

impl RunnerPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "ready",
            Self::Hatching => "hatching",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a generation of workers may be alive.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Hatching | Self::Running)
    }
}

impl fmt::Display for RunnerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Largest worker pool a single hatch may request.
pub const MAX_HATCH_CLIENTS: usize = 1_000_000;

/// A validated hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HatchRequest {
    pub clients: NonZeroUsize,
    pub hatch_rate: NonZeroUsize,
}

impl HatchRequest {
    /// # Errors
    ///
    /// Returns an error when either value is below one, or when more than
    /// [`MAX_HATCH_CLIENTS`] workers are requested.
    pub fn new(num_clients: i64, hatch_rate: i64) -> Result<Self, ValidationError> {
        let clients = positive(num_clients)
            .ok_or(ValidationError::InvalidClientCount { value: num_clients })?;
        if clients.get() > MAX_HATCH_CLIENTS {
            return Err(ValidationError::ClientCountTooLarge {
                value: num_clients,
                max: MAX_HATCH_CLIENTS,
            });
        }
        let hatch_rate = positive(hatch_rate)
            .ok_or(ValidationError::InvalidHatchRate { value: hatch_rate })?;
        Ok(Self {
            clients,
            hatch_rate,
        })
    }
}

fn positive(value: i64) -> Option<NonZeroUsize> {
    usize::try_from(value).ok().and_then(NonZeroUsize::new)
}

/// Per-worker task table, swapped wholesale by weight re-syncs.
pub(crate) type Assignment = Arc<RwLock<Vec<Arc<Task>>>>;

/// Read side of a generation's stop signal.
#[derive(Clone, Debug)]
pub(crate) struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    pub(crate) fn is_stopped(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the generation is cancelled or dropped.
    pub(crate) async fn stopped(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            // Generation dropped without an explicit cancel.
        }
    }
}

/// One set of workers started by a single hatch.
#[derive(Debug)]
pub(super) struct Generation {
    pub(super) id: u64,
    stop_tx: watch::Sender<bool>,
}

impl Generation {
    pub(super) fn new(id: u64) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self { id, stop_tx }
    }

    pub(super) fn stop_token(&self) -> StopToken {
        StopToken {
            rx: self.stop_tx.subscribe(),
        }
    }

    /// Closes the stop token; every worker of this generation observes it.
    pub(super) fn cancel(&self) {
        self.stop_tx.send_replace(true);
    }
}

#[derive(Debug)]
pub(super) struct RunnerState {
    pub(super) phase: RunnerPhase,
    pub(super) generation: Option<Generation>,
    pub(super) hatch_rate: usize,
    pub(super) generations_started: u64,
}

impl RunnerState {
    pub(super) const fn new() -> Self {
        Self {
            phase: RunnerPhase::Init,
            generation: None,
            hatch_rate: 0,
            generations_started: 0,
        }
    }

    pub(super) fn is_current(&self, id: u64) -> bool {
        self.generation
            .as_ref()
            .is_some_and(|generation| generation.id == id)
    }
}
