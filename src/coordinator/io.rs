use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{AppError, AppResult, CoordinatorError};

pub(super) const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Reads one newline-terminated JSON message.
pub(super) async fn read_message<R, T>(reader: &mut R) -> AppResult<T>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let bytes = (&mut *reader)
        .take(u64::try_from(MAX_MESSAGE_BYTES.saturating_add(1)).unwrap_or(u64::MAX))
        .read_until(b'\n', &mut buffer)
        .await
        .map_err(|err| {
            AppError::coordinator(CoordinatorError::Io {
                context: "read coordinator message",
                source: err,
            })
        })?;
    if bytes == 0 {
        return Err(AppError::coordinator(CoordinatorError::ConnectionClosed));
    }
    if buffer.len() > MAX_MESSAGE_BYTES {
        return Err(AppError::coordinator(
            CoordinatorError::WireMessageTooLarge {
                max_bytes: MAX_MESSAGE_BYTES,
            },
        ));
    }
    if buffer.ends_with(b"\n") {
        buffer.pop();
        if buffer.ends_with(b"\r") {
            buffer.pop();
        }
    }
    let line = std::str::from_utf8(&buffer).map_err(|err| {
        AppError::coordinator(CoordinatorError::WireMessageInvalidUtf8 { source: err })
    })?;
    serde_json::from_str::<T>(line).map_err(|err| {
        AppError::coordinator(CoordinatorError::Deserialize {
            context: "coordinator message",
            source: err,
        })
    })
}

/// Writes `message` as one JSON line.
pub(super) async fn send_message<W, T>(writer: &mut W, message: &T) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut payload = serde_json::to_string(message).map_err(|err| {
        AppError::coordinator(CoordinatorError::Serialize {
            context: "worker message",
            source: err,
        })
    })?;
    payload.push('\n');
    writer.write_all(payload.as_bytes()).await.map_err(|err| {
        AppError::coordinator(CoordinatorError::Io {
            context: "send worker message",
            source: err,
        })
    })?;
    writer.flush().await.map_err(|err| {
        AppError::coordinator(CoordinatorError::Io {
            context: "flush worker message",
            source: err,
        })
    })
}
