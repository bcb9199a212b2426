//! In-process stand-in for the activity server.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::{
    client::{ActivityServer, BucketSpec, ServerInfo},
    error::ServerError,
    event::ActivityEvent,
};

#[derive(Debug, Clone)]
pub struct RecordedHeartbeat {
    pub bucket_id: String,
    pub pulsetime: f64,
    pub event: ActivityEvent,
}

pub struct MockServer {
    reachable: AtomicBool,
    hostname: Mutex<String>,
    info_calls: AtomicUsize,
    buckets_created: AtomicUsize,
    heartbeats: Mutex<Vec<RecordedHeartbeat>>,
}

impl MockServer {
    fn new(hostname: &str, reachable: bool) -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(reachable),
            hostname: Mutex::new(hostname.to_string()),
            info_calls: AtomicUsize::new(0),
            buckets_created: AtomicUsize::new(0),
            heartbeats: Mutex::new(Vec::new()),
        })
    }

    pub fn online(hostname: &str) -> Arc<Self> {
        Self::new(hostname, true)
    }

    pub fn offline(hostname: &str) -> Arc<Self> {
        Self::new(hostname, false)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_hostname(&self, hostname: &str) {
        *self.hostname.lock().unwrap() = hostname.to_string();
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn buckets_created(&self) -> usize {
        self.buckets_created.load(Ordering::SeqCst)
    }

    pub fn heartbeats(&self) -> Vec<RecordedHeartbeat> {
        self.heartbeats.lock().unwrap().clone()
    }

    fn check(&self, api: &'static str) -> Result<(), ServerError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ServerError::Http {
                api,
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }
}

#[async_trait]
impl ActivityServer for MockServer {
    async fn info(&self) -> Result<ServerInfo, ServerError> {
        self.check("info")?;
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ServerInfo {
            hostname: self.hostname.lock().unwrap().clone(),
            version: Some("v0.13.1".to_string()),
            testing: true,
        })
    }

    async fn create_bucket(&self, _bucket_id: &str, _spec: &BucketSpec) -> Result<(), ServerError> {
        self.check("bucket")?;
        self.buckets_created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn heartbeat(
        &self,
        bucket_id: &str,
        pulsetime: f64,
        event: &ActivityEvent,
    ) -> Result<(), ServerError> {
        self.check("heartbeat")?;
        self.heartbeats.lock().unwrap().push(RecordedHeartbeat {
            bucket_id: bucket_id.to_string(),
            pulsetime,
            event: event.clone(),
        });
        Ok(())
    }
}
