use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{AppError, AppResult, CoordinatorError};

use super::protocol::{CoordinatorCommand, WorkerMessage};

/// Outbound half of the link, shared by the runner's loops.
#[derive(Clone, Debug)]
pub struct CoordinatorSender {
    outbound: mpsc::UnboundedSender<WorkerMessage>,
    disconnected: watch::Receiver<bool>,
}

impl CoordinatorSender {
    /// Queues `message` for the transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport has shut down.
    pub fn send(&self, message: WorkerMessage) -> AppResult<()> {
        let kind = message.kind();
        self.outbound.send(message).map_err(|_closed| {
            AppError::coordinator(CoordinatorError::CoordinatorConnectionClosed)
        })?;
        debug!("Queued {} for coordinator", kind);
        Ok(())
    }

    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        *self.disconnected.borrow() || self.disconnected.has_changed().is_err()
    }

    /// Resolves once the transport reports that the connection is gone.
    pub async fn wait_disconnected(&self) {
        let mut disconnected = self.disconnected.clone();
        if disconnected.wait_for(|flag| *flag).await.is_err() {
            // Transport dropped its flag; the connection is gone either way.
        }
    }
}

/// Inbound half of the link, consumed by the runner's command intake.
#[derive(Debug)]
pub struct CoordinatorReceiver {
    commands: mpsc::UnboundedReceiver<CoordinatorCommand>,
}

impl CoordinatorReceiver {
    /// Next command; `None` once the transport has closed.
    pub async fn receive(&mut self) -> Option<CoordinatorCommand> {
        self.commands.recv().await
    }
}

/// The transport's side of a link.
#[derive(Debug)]
pub struct TransportEnd {
    pub outbound: mpsc::UnboundedReceiver<WorkerMessage>,
    pub inbound: mpsc::UnboundedSender<CoordinatorCommand>,
    pub disconnected: watch::Sender<bool>,
}

/// Creates an unconnected link. A transport (or a test) drives the
/// returned [`TransportEnd`].
#[must_use]
pub fn link() -> (CoordinatorSender, CoordinatorReceiver, TransportEnd) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (disconnected_tx, disconnected_rx) = watch::channel(false);
    (
        CoordinatorSender {
            outbound: outbound_tx,
            disconnected: disconnected_rx,
        },
        CoordinatorReceiver {
            commands: inbound_rx,
        },
        TransportEnd {
            outbound: outbound_rx,
            inbound: inbound_tx,
            disconnected: disconnected_tx,
        },
    )
}
