use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
};

use crate::{
    config::get_data_dir,
    control::{ControlRequest, ControlResponse, Controller},
    error::ControlError,
    host::MAX_MESSAGE_SIZE,
};

/// Default socket path inside the data directory.
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn socket_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("tabwatch.sock"))
}

/// CLI side of the control socket. One request per connection.
#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send `request` to the running agent and wait for its answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent is not reachable or answers with garbage.
    pub async fn send(&self, request: &ControlRequest) -> Result<ControlResponse> {
        let mut stream = UnixStream::connect(&self.sock_path)
            .await
            .with_context(|| {
                format!(
                    "Agent not running (no socket at {})",
                    self.sock_path.display()
                )
            })?;

        let encoded = serde_json::to_vec(request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: ControlResponse =
            serde_json::from_slice(&buffer).context("Invalid response from agent")?;
        Ok(response)
    }
}

async fn handle_connection(controller: &Controller, stream: &mut UnixStream) -> Result<()> {
    let mut buffer = Vec::new();
    (&mut *stream)
        .take(MAX_MESSAGE_SIZE as u64)
        .read_to_end(&mut buffer)
        .await?;

    let response = match serde_json::from_slice::<Value>(&buffer) {
        Ok(value) => controller.handle_value(value).await,
        Err(e) => ControlError::InvalidRequest(e.to_string()).into(),
    };

    let encoded = serde_json::to_vec(&response)?;
    stream.write_all(&encoded).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Accept control connections forever.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound.
pub async fn listen(controller: Controller, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    if let Some(parent) = sock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(sock_path)?;
    log::info!("Control socket listening at {}", sock_path.display());

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let controller = controller.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(&controller, &mut stream).await {
                        log::error!("IPC connection error: {e}");
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}
