use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, Notify, OnceCell},
    task::JoinHandle,
};

use crate::{
    client::{ActivityServer, BucketIdentity},
    config::SettingsStore,
    error::ServerError,
    event::ActivityEvent,
};

/// Delay before re-attempting bucket creation after a failure
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Health of the link to the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Checking,
    Connected,
}

/// Outcome of handing an event to the dispatcher
#[derive(Debug)]
pub enum Submission {
    /// Heartbeat is in flight on its own task
    Dispatched(JoinHandle<()>),
    /// Not connected; the event was discarded
    Dropped(ConnectionState),
}

/// Point-in-time view for status reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchStatus {
    pub connection: ConnectionState,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub current_url: Option<String>,
    pub bucket_id: Option<String>,
}

#[derive(Debug, Default)]
struct DispatchState {
    connection: ConnectionState,
    last_heartbeat: Option<DateTime<Utc>>,
    current_url: Option<String>,
}

struct Inner {
    server: Arc<dyn ActivityServer>,
    settings: Arc<SettingsStore>,
    state: Mutex<DispatchState>,
    bucket: OnceCell<BucketIdentity>,
    retry: Notify,
    retry_delay: Duration,
}

/// Sends heartbeats and owns the connection state machine.
///
/// There is no backlog: events produced while not `Connected` are dropped.
/// Results of network calls are applied whenever they resolve, so the last
/// one to finish decides the state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(server: Arc<dyn ActivityServer>, settings: Arc<SettingsStore>) -> Self {
        Self::with_retry_delay(server, settings, RETRY_DELAY)
    }

    #[must_use]
    pub fn with_retry_delay(
        server: Arc<dyn ActivityServer>,
        settings: Arc<SettingsStore>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                server,
                settings,
                state: Mutex::new(DispatchState::default()),
                bucket: OnceCell::new(),
                retry: Notify::new(),
                retry_delay,
            }),
        }
    }

    /// Spawn the retry worker and the initial bucket-ensure attempt.
    pub fn start(&self) {
        let worker = self.clone();
        tokio::spawn(async move { worker.retry_loop().await });

        let initial = self.clone();
        tokio::spawn(async move {
            initial.ensure_bucket().await;
        });
    }

    /// Waits for a retry request, sleeps, re-attempts. `Notify` keeps at most
    /// one pending permit, so retries never stack up.
    async fn retry_loop(self) {
        loop {
            self.inner.retry.notified().await;
            tokio::time::sleep(self.inner.retry_delay).await;
            log::info!("Retrying connection to server");
            self.ensure_bucket().await;
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.state.lock().await.connection
    }

    pub async fn status(&self) -> DispatchStatus {
        let state = self.inner.state.lock().await;
        DispatchStatus {
            connection: state.connection,
            last_heartbeat: state.last_heartbeat,
            current_url: state.current_url.clone(),
            bucket_id: self.inner.bucket.get().map(|b| b.id.clone()),
        }
    }

    /// Make sure the bucket exists. Idempotent; safe to call concurrently.
    ///
    /// Returns whether the dispatcher ended up `Connected`.
    pub async fn ensure_bucket(&self) -> bool {
        self.set_connection(ConnectionState::Checking).await;

        match self.try_ensure_bucket().await {
            Ok(bucket) => {
                log::info!("Connected to server, bucket {}", bucket.id);
                self.set_connection(ConnectionState::Connected).await;
                true
            }
            Err(e) => {
                log::warn!(
                    "Server unavailable ({e}), retrying in {}s",
                    self.inner.retry_delay.as_secs()
                );
                self.disconnect().await;
                false
            }
        }
    }

    async fn try_ensure_bucket(&self) -> Result<&BucketIdentity, ServerError> {
        let bucket = self
            .inner
            .bucket
            .get_or_try_init(|| async {
                let info = self.inner.server.info().await?;
                log::info!("Resolved server {info}");
                Ok::<_, ServerError>(BucketIdentity::for_hostname(&info.hostname))
            })
            .await?;
        self.inner
            .server
            .create_bucket(&bucket.id, &bucket.spec())
            .await?;
        Ok(bucket)
    }

    /// Hand over an event. Returns immediately; the network round trip runs on
    /// its own task.
    pub async fn submit(&self, event: ActivityEvent) -> Submission {
        let connection = {
            let mut state = self.inner.state.lock().await;
            state.current_url = Some(event.data.url.clone());
            state.connection
        };

        let bucket_id = match (connection, self.inner.bucket.get()) {
            (ConnectionState::Connected, Some(bucket)) => bucket.id.clone(),
            _ => {
                log::debug!("Dropping event for {} ({connection:?})", event.data.domain);
                return Submission::Dropped(connection);
            }
        };

        let this = self.clone();
        Submission::Dispatched(tokio::spawn(async move {
            this.send(&bucket_id, &event).await;
        }))
    }

    async fn send(&self, bucket_id: &str, event: &ActivityEvent) {
        let pulsetime = self.inner.settings.current().await.pulsetime();
        match self
            .inner
            .server
            .heartbeat(bucket_id, pulsetime, event)
            .await
        {
            Ok(()) => {
                log::debug!(
                    "Heartbeat: {} [{}]",
                    event.data.domain,
                    event.data.category.as_deref().unwrap_or("uncategorized")
                );
                self.inner.state.lock().await.last_heartbeat = Some(Utc::now());
            }
            Err(e) => {
                log::warn!("Heartbeat failed: {e}");
                self.disconnect().await;
            }
        }
    }

    async fn disconnect(&self) {
        self.set_connection(ConnectionState::Disconnected).await;
        self.inner.retry.notify_one();
    }

    async fn set_connection(&self, to: ConnectionState) {
        let mut state = self.inner.state.lock().await;
        if state.connection != to {
            log::debug!("Connection {:?} -> {to:?}", state.connection);
            state.connection = to;
        }
    }
}
