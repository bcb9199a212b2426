use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::sync::RwLock;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5600";

/// Lower bound for the sampling timer. A zero period would stall the agent loop.
const MIN_POLL_INTERVAL_MS: u64 = 1_000;

/// Get the local data directory for tabwatch.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("tabwatch");
    Ok(path)
}

/// Tracking configuration shared by every pipeline stage.
///
/// Any key missing from the persisted file falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub server_url: String,
    pub track_urls: bool,
    pub track_titles: bool,
    pub incognito_tracking: bool,
    pub exclude_domains: BTreeSet<String>,
    pub exclude_patterns: BTreeSet<String>,
    /// Title regexes; a matching title is sent as `[REDACTED]`
    pub exclude_titles: BTreeSet<String>,
    /// Mask personal data (emails, phone numbers) in titles
    pub redact_pii: bool,
    pub client_keywords: BTreeMap<String, Vec<String>>,
    pub enabled: bool,
    pub poll_interval_ms: u64,
    pub pulsetime_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            track_urls: true,
            track_titles: true,
            incognito_tracking: false,
            exclude_domains: ["localhost", "127.0.0.1"]
                .into_iter()
                .map(String::from)
                .collect(),
            exclude_patterns: BTreeSet::new(),
            exclude_titles: [".*[Pp]assword.*", ".*[Pp]rivate.*", ".*[Ss]ecret.*"]
                .into_iter()
                .map(String::from)
                .collect(),
            redact_pii: true,
            client_keywords: BTreeMap::new(),
            enabled: true,
            poll_interval_ms: 5_000,
            pulsetime_seconds: 6.0,
        }
    }
}

impl Config {
    /// Sampling period, clamped so the timer never spins.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    /// Merge window sent with every heartbeat
    #[must_use]
    pub fn pulsetime(&self) -> f64 {
        self.pulsetime_seconds.max(0.0)
    }

    /// Merge the fields present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(server_url) = patch.server_url {
            self.server_url = server_url.trim_end_matches('/').to_string();
        }
        if let Some(track_urls) = patch.track_urls {
            self.track_urls = track_urls;
        }
        if let Some(track_titles) = patch.track_titles {
            self.track_titles = track_titles;
        }
        if let Some(incognito_tracking) = patch.incognito_tracking {
            self.incognito_tracking = incognito_tracking;
        }
        if let Some(exclude_domains) = patch.exclude_domains {
            self.exclude_domains = exclude_domains
                .into_iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect();
        }
        if let Some(exclude_patterns) = patch.exclude_patterns {
            // An empty regex matches every URL
            self.exclude_patterns = exclude_patterns
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect();
        }
        if let Some(exclude_titles) = patch.exclude_titles {
            self.exclude_titles = exclude_titles
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect();
        }
        if let Some(redact_pii) = patch.redact_pii {
            self.redact_pii = redact_pii;
        }
        if let Some(client_keywords) = patch.client_keywords {
            self.client_keywords = client_keywords;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(poll_interval_ms) = patch.poll_interval_ms {
            self.poll_interval_ms = poll_interval_ms;
        }
        if let Some(pulsetime_seconds) = patch.pulsetime_seconds {
            self.pulsetime_seconds = pulsetime_seconds;
        }
    }
}

/// Partial settings update carried by `saveSettings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_urls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_titles: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incognito_tracking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_domains: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_titles: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redact_pii: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_keywords: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulsetime_seconds: Option<f64>,
}

impl SettingsPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Owner of the persisted [`Config`].
///
/// Every committed change bumps a revision counter so readers holding derived
/// state (compiled patterns) know when to drop it.
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<Config>,
    revision: AtomicU64,
}

impl SettingsStore {
    /// Load settings from `path`, falling back to defaults for a missing or
    /// unreadable file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!("Loaded settings from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Settings file {} is invalid ({e}), using defaults",
                        path.display()
                    );
                    Config::default()
                }
            }
        } else {
            log::info!("No settings at {}, using defaults", path.display());
            Config::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
            revision: AtomicU64::new(0),
        })
    }

    /// Store that never touches disk
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self {
            path: None,
            data: RwLock::new(config),
            revision: AtomicU64::new(0),
        }
    }

    /// Current configuration. Callers get a copy and re-read it every cycle.
    pub async fn current(&self) -> Config {
        self.data.read().await.clone()
    }

    /// Consume the store, for one-shot readers outside the agent.
    #[must_use]
    pub fn into_config(self) -> Config {
        self.data.into_inner()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Merge `patch` into the configuration and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the settings file fails. The in-memory
    /// configuration is still updated in that case.
    pub async fn save(&self, patch: SettingsPatch) -> Result<Config> {
        let mut guard = self.data.write().await;
        guard.apply(patch);
        self.revision.fetch_add(1, Ordering::SeqCst);
        let updated = guard.clone();
        self.persist(&updated).await?;
        Ok(updated)
    }

    /// Update the `enabled` flag, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the settings file fails.
    pub async fn set_enabled(&self, enabled: bool) -> Result<bool> {
        let mut guard = self.data.write().await;
        let previous = guard.enabled;
        guard.enabled = enabled;
        self.revision.fetch_add(1, Ordering::SeqCst);
        let updated = guard.clone();
        self.persist(&updated).await?;
        Ok(previous)
    }

    async fn persist(&self, config: &Config) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(config)?;
        tokio::fs::write(path, serialized)
            .await
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}
