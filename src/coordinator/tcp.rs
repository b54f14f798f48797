use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, CoordinatorError};

use super::io::{read_message, send_message};
use super::link::{CoordinatorReceiver, CoordinatorSender, TransportEnd, link};
use super::protocol::{CoordinatorCommand, WorkerMessage};

/// Connects to the coordinator at `addr` and starts the transport tasks.
///
/// # Errors
///
/// Returns an error when the TCP connection cannot be established.
pub async fn connect(addr: &str) -> AppResult<(CoordinatorSender, CoordinatorReceiver)> {
    info!("Connecting to coordinator {}", addr);
    let stream = TcpStream::connect(addr).await.map_err(|err| {
        AppError::coordinator(CoordinatorError::Connection {
            addr: addr.to_owned(),
            source: err,
        })
    })?;
    if let Err(err) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle on coordinator socket: {}", err);
    }
    info!("Connected to coordinator {}", addr);
    let (read_half, write_half) = stream.into_split();
    Ok(attach(read_half, write_half))
}

/// Runs the link over an arbitrary byte stream pair.
///
/// The writer stops after forwarding `quit` and shuts its half down; either
/// side ending raises the disconnected flag and closes the command stream.
pub fn attach<R, W>(read_half: R, write_half: W) -> (CoordinatorSender, CoordinatorReceiver)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, receiver, transport) = link();
    let TransportEnd {
        outbound,
        inbound,
        disconnected,
    } = transport;
    let disconnected = Arc::new(disconnected);

    tokio::spawn(write_loop(write_half, outbound, Arc::clone(&disconnected)));
    tokio::spawn(read_loop(BufReader::new(read_half), inbound, disconnected));
    (sender, receiver)
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound: tokio::sync::mpsc::UnboundedReceiver<WorkerMessage>,
    disconnected: Arc<watch::Sender<bool>>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        let quitting = matches!(message, WorkerMessage::Quit { .. });
        if let Err(err) = send_message(&mut writer, &message).await {
            warn!("Failed to send {} to coordinator: {}", message.kind(), err);
            break;
        }
        if quitting {
            if writer.shutdown().await.is_err() {
                // Peer may already be gone.
            }
            debug!("Quit delivered; coordinator link closed");
            break;
        }
    }
    disconnected.send_replace(true);
}

async fn read_loop<R>(
    mut reader: BufReader<R>,
    inbound: tokio::sync::mpsc::UnboundedSender<CoordinatorCommand>,
    disconnected: Arc<watch::Sender<bool>>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match read_message::<_, CoordinatorCommand>(&mut reader).await {
            Ok(command) => {
                if inbound.send(command).is_err() {
                    break;
                }
            }
            Err(AppError::Coordinator(CoordinatorError::Deserialize { source, .. })) => {
                warn!("Ignoring unreadable coordinator message: {}", source);
            }
            Err(AppError::Coordinator(CoordinatorError::ConnectionClosed)) => {
                info!("Coordinator closed the connection");
                break;
            }
            Err(err) => {
                warn!("Coordinator connection lost: {}", err);
                break;
            }
        }
    }
    disconnected.send_replace(true);
}
