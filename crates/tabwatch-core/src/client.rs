//! HTTP client for the ActivityWatch-compatible REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use url::Url;

use crate::{config::SettingsStore, error::ServerError, event::ActivityEvent};

/// Client name reported when creating the bucket
pub const CLIENT_NAME: &str = "aw-watcher-web-enhanced";
pub const BUCKET_TYPE: &str = "web.tab.current";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Subset of `GET /api/0/info`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerInfo {
    pub hostname: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub testing: bool,
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({}",
            self.hostname,
            self.version.as_deref().unwrap_or("unknown version")
        )?;
        if self.testing {
            f.write_str(", testing instance")?;
        }
        f.write_str(")")
    }
}

/// Bucket this agent writes to, fixed once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketIdentity {
    pub id: String,
    pub hostname: String,
}

impl BucketIdentity {
    #[must_use]
    pub fn for_hostname(hostname: &str) -> Self {
        Self {
            id: format!("{CLIENT_NAME}_{hostname}"),
            hostname: hostname.to_string(),
        }
    }

    #[must_use]
    pub fn spec(&self) -> BucketSpec {
        BucketSpec {
            client: CLIENT_NAME.to_string(),
            bucket_type: BUCKET_TYPE.to_string(),
            hostname: self.hostname.clone(),
        }
    }
}

/// Body of the bucket-creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSpec {
    pub client: String,
    #[serde(rename = "type")]
    pub bucket_type: String,
    pub hostname: String,
}

/// Server operations the dispatcher depends on
#[async_trait]
pub trait ActivityServer: Send + Sync {
    /// Fetch server metadata
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or answers with a failure status
    async fn info(&self) -> Result<ServerInfo, ServerError>;

    /// Create the bucket; an existing bucket counts as success
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or answers with a failure status
    async fn create_bucket(&self, bucket_id: &str, spec: &BucketSpec) -> Result<(), ServerError>;

    /// Send one heartbeat to be merged within `pulsetime` seconds
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or answers with a failure status
    async fn heartbeat(
        &self,
        bucket_id: &str,
        pulsetime: f64,
        event: &ActivityEvent,
    ) -> Result<(), ServerError>;
}

/// Extension trait for `reqwest::Response` to map failure statuses.
#[async_trait]
trait ResponseExt {
    async fn ensure_success(self, api: &'static str) -> Result<Self, ServerError>
    where
        Self: Sized;
}

#[async_trait]
impl ResponseExt for reqwest::Response {
    async fn ensure_success(self, api: &'static str) -> Result<Self, ServerError> {
        if !self.status().is_success() {
            let status = self.status().as_u16();
            let body = self.text().await.unwrap_or_default();
            return Err(ServerError::Http { api, status, body });
        }
        Ok(self)
    }
}

/// REST client. The base URL is read from settings on every call so a saved
/// `serverUrl` applies to the next request.
pub struct AwServerClient {
    client: Client,
    settings: Arc<SettingsStore>,
}

impl AwServerClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(settings: Arc<SettingsStore>) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tabwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, settings })
    }

    async fn endpoint(&self, segments: &[&str]) -> Result<Url, ServerError> {
        let base = self.settings.current().await.server_url;
        let mut url = Url::parse(&base).map_err(|_| ServerError::InvalidUrl(base.clone()))?;
        url.path_segments_mut()
            .map_err(|()| ServerError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(["api", "0"])
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ActivityServer for AwServerClient {
    async fn info(&self) -> Result<ServerInfo, ServerError> {
        let url = self.endpoint(&["info"]).await?;
        let info = self
            .client
            .get(url)
            .send()
            .await?
            .ensure_success("info")
            .await?
            .json::<ServerInfo>()
            .await?;
        Ok(info)
    }

    async fn create_bucket(&self, bucket_id: &str, spec: &BucketSpec) -> Result<(), ServerError> {
        let url = self.endpoint(&["buckets", bucket_id]).await?;
        let response = self.client.post(url).json(spec).send().await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            log::debug!("Bucket {bucket_id} already exists");
            return Ok(());
        }
        response.ensure_success("bucket").await?;
        Ok(())
    }

    async fn heartbeat(
        &self,
        bucket_id: &str,
        pulsetime: f64,
        event: &ActivityEvent,
    ) -> Result<(), ServerError> {
        let mut url = self.endpoint(&["buckets", bucket_id, "heartbeat"]).await?;
        url.query_pairs_mut()
            .append_pair("pulsetime", &pulsetime.to_string());
        self.client
            .post(url)
            .json(event)
            .send()
            .await?
            .ensure_success("heartbeat")
            .await?;
        Ok(())
    }
}
