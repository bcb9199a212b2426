//! Native-messaging transport between the browser extension and the agent.
//!
//! Every message is a 4-byte native-endian length followed by that many bytes
//! of UTF-8 JSON, in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc::{self, UnboundedSender},
};

use crate::{
    control::{ControlResponse, Controller},
    error::HostError,
    observer::{TabEvent, TabObserver, Trigger},
};

/// Browsers refuse host messages above 1 MiB; the same cap is applied inbound.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Read one framed message. `Ok(None)` means the browser closed the pipe.
///
/// An oversized message is drained before [`HostError::TooLarge`] is returned,
/// so the stream stays aligned on frame boundaries.
///
/// # Errors
///
/// Returns an error on I/O failure, an oversized frame or invalid JSON.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Value>, HostError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_ne_bytes(prefix);
    let size = usize::try_from(len).unwrap_or(usize::MAX);

    if size > MAX_MESSAGE_SIZE {
        let mut oversized = (&mut *reader).take(u64::from(len));
        tokio::io::copy(&mut oversized, &mut tokio::io::sink()).await?;
        return Err(HostError::TooLarge(size));
    }

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Write one framed message and flush.
///
/// # Errors
///
/// Returns an error if the message exceeds [`MAX_MESSAGE_SIZE`] or the write fails.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)?;
    let len = u32::try_from(body.len())
        .ok()
        .filter(|_| body.len() <= MAX_MESSAGE_SIZE)
        .ok_or(HostError::TooLarge(body.len()))?;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ControlEnvelope {
    #[serde(default)]
    id: Value,
    request: Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum HostReply {
    Reply { id: Value, response: ControlResponse },
}

/// Hand a reply to the writer task. Returns `false` once the writer is gone.
fn queue_reply(replies: &UnboundedSender<HostReply>, reply: HostReply) -> bool {
    match replies.send(reply) {
        Ok(()) => true,
        Err(unsent) => {
            log::debug!("Reply writer stopped, dropping {:?}", unsent.0);
            false
        }
    }
}

enum Incoming {
    Tab(TabEvent),
    Control(ControlEnvelope),
}

impl Incoming {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.get("kind").and_then(Value::as_str) == Some("control") {
            serde_json::from_value(value).map(Self::Control)
        } else {
            serde_json::from_value(value).map(Self::Tab)
        }
    }
}

/// Routes browser messages: tab events to the observer, control requests to
/// the controller.
pub struct NativeHost {
    observer: TabObserver,
    controller: Controller,
    triggers: UnboundedSender<Trigger>,
}

impl NativeHost {
    #[must_use]
    pub fn new(
        observer: TabObserver,
        controller: Controller,
        triggers: UnboundedSender<Trigger>,
    ) -> Self {
        Self {
            observer,
            controller,
            triggers,
        }
    }

    /// Serve until the browser closes `reader`.
    ///
    /// Control requests run on their own tasks; replies are funnelled through
    /// one writer task so frames never interleave.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the browser fails.
    pub async fn serve<R, W>(self, mut reader: R, mut writer: W) -> Result<(), HostError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (replies, mut outbox) = mpsc::unbounded_channel::<HostReply>();
        let writer_task = tokio::spawn(async move {
            while let Some(reply) = outbox.recv().await {
                if let Err(e) = write_message(&mut writer, &reply).await {
                    log::error!("Failed to write reply to browser: {e}");
                }
            }
        });

        loop {
            let value = match read_message(&mut reader).await {
                Ok(Some(value)) => value,
                Ok(None) => {
                    log::info!("Browser disconnected");
                    break;
                }
                Err(HostError::Io(e)) => return Err(HostError::Io(e)),
                Err(e) => {
                    log::warn!("Skipping browser message: {e}");
                    continue;
                }
            };

            match Incoming::from_value(value) {
                Ok(Incoming::Tab(event)) => {
                    if let Some(trigger) = self.observer.observe(event).await {
                        if self.triggers.send(trigger).is_err() {
                            log::warn!("Agent loop is gone, dropping {trigger} trigger");
                        }
                    }
                }
                Ok(Incoming::Control(envelope)) => {
                    let controller = self.controller.clone();
                    let replies = replies.clone();
                    tokio::spawn(async move {
                        let response = controller.handle_value(envelope.request).await;
                        queue_reply(
                            &replies,
                            HostReply::Reply {
                                id: envelope.id,
                                response,
                            },
                        );
                    });
                }
                Err(e) => log::warn!("Skipping unrecognized browser message: {e}"),
            }
        }

        drop(replies);
        if let Err(e) = writer_task.await {
            log::error!("Reply writer task failed: {e}");
        }
        Ok(())
    }
}
