/// Settings argument parsing and display
use anyhow::Result;
use clap::Args;
use std::collections::{BTreeMap, BTreeSet};
use tabled::Tabled;
use tabwatch_core::{Config, SettingsPatch};

#[derive(Args, Debug, Default)]
pub struct SetArgs {
    /// Base URL of the time-tracking server
    #[arg(long)]
    server_url: Option<String>,
    /// Send full URLs (false: origin only)
    #[arg(long)]
    track_urls: Option<bool>,
    /// Send page titles
    #[arg(long)]
    track_titles: Option<bool>,
    /// Track incognito/private windows
    #[arg(long)]
    incognito_tracking: Option<bool>,
    /// Replace the excluded domains (repeatable, pass "" to clear)
    #[arg(long = "exclude-domain")]
    exclude_domains: Option<Vec<String>>,
    /// Replace the excluded URL patterns (repeatable, pass "" to clear)
    #[arg(long = "exclude-pattern")]
    exclude_patterns: Option<Vec<String>>,
    /// Replace the title patterns that redact a title (repeatable, pass "" to clear)
    #[arg(long = "exclude-title")]
    exclude_titles: Option<Vec<String>>,
    /// Mask emails and phone numbers in titles
    #[arg(long)]
    redact_pii: Option<bool>,
    /// Replace client keywords, e.g. --client "Acme=acme,acme-corp" (repeatable)
    #[arg(long = "client", value_parser = parse_client)]
    clients: Option<Vec<(String, Vec<String>)>>,
    /// Sampling period in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Server-side merge window in seconds
    #[arg(long)]
    pulsetime: Option<f64>,
}

impl SetArgs {
    /// Turn the given options into a patch.
    ///
    /// # Errors
    ///
    /// Returns an error if no option was given.
    pub fn into_patch(self) -> Result<SettingsPatch> {
        let patch = SettingsPatch {
            server_url: self.server_url,
            track_urls: self.track_urls,
            track_titles: self.track_titles,
            incognito_tracking: self.incognito_tracking,
            exclude_domains: self.exclude_domains.map(collect_set),
            exclude_patterns: self.exclude_patterns.map(collect_set),
            exclude_titles: self.exclude_titles.map(collect_set),
            redact_pii: self.redact_pii,
            client_keywords: self.clients.map(|clients| {
                clients
                    .into_iter()
                    .filter(|(_, keywords)| !keywords.is_empty())
                    .collect::<BTreeMap<_, _>>()
            }),
            enabled: None,
            poll_interval_ms: self.poll_interval_ms,
            pulsetime_seconds: self.pulsetime,
        };
        if patch.is_empty() {
            anyhow::bail!("Nothing to change; see `tabwatch set --help`");
        }
        Ok(patch)
    }
}

fn collect_set(values: Vec<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// `NAME=kw1,kw2` -> `("NAME", ["kw1", "kw2"])`; `NAME=` clears that client.
fn parse_client(raw: &str) -> Result<(String, Vec<String>), String> {
    let (name, keywords) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=keyword[,keyword...], got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("client name must not be empty".to_string());
    }
    let keywords = keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();
    Ok((name.to_string(), keywords))
}

#[derive(Tabled)]
pub struct SettingRow {
    #[tabled(rename = "Setting")]
    key: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn list(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[must_use]
pub fn setting_rows(config: &Config) -> Vec<SettingRow> {
    let clients = if config.client_keywords.is_empty() {
        "-".to_string()
    } else {
        config
            .client_keywords
            .iter()
            .map(|(client, keywords)| format!("{client}={}", keywords.join(",")))
            .collect::<Vec<_>>()
            .join("; ")
    };

    vec![
        SettingRow {
            key: "enabled",
            value: config.enabled.to_string(),
        },
        SettingRow {
            key: "serverUrl",
            value: config.server_url.clone(),
        },
        SettingRow {
            key: "trackUrls",
            value: config.track_urls.to_string(),
        },
        SettingRow {
            key: "trackTitles",
            value: config.track_titles.to_string(),
        },
        SettingRow {
            key: "incognitoTracking",
            value: config.incognito_tracking.to_string(),
        },
        SettingRow {
            key: "excludeDomains",
            value: list(&config.exclude_domains),
        },
        SettingRow {
            key: "excludePatterns",
            value: list(&config.exclude_patterns),
        },
        SettingRow {
            key: "excludeTitles",
            value: list(&config.exclude_titles),
        },
        SettingRow {
            key: "redactPii",
            value: config.redact_pii.to_string(),
        },
        SettingRow {
            key: "clientKeywords",
            value: clients,
        },
        SettingRow {
            key: "pollIntervalMs",
            value: config.poll_interval_ms.to_string(),
        },
        SettingRow {
            key: "pulsetimeSeconds",
            value: config.pulsetime_seconds.to_string(),
        },
    ]
}
