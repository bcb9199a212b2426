use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::{config::Config, observer::TabSnapshot};

/// Parsed pieces of a tab URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub url: String,
    pub protocol: String,
    pub domain: String,
    pub path: String,
    origin: String,
}

impl PageLocation {
    /// Parse an absolute URL. Returns `None` for relative or malformed input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let parsed = Url::parse(raw.trim()).ok()?;
        let domain = parsed.host_str().unwrap_or_default().to_lowercase();
        Some(Self {
            url: parsed.as_str().to_string(),
            protocol: parsed.scheme().to_string(),
            path: parsed.path().to_string(),
            origin: parsed.origin().ascii_serialization(),
            domain,
        })
    }

    /// Scheme + host (+ port) only, for when full URLs must not leave the machine
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Payload of a heartbeat, as the server stores it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatData {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub path: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tab_count: usize,
    pub audible: bool,
    pub incognito: bool,
}

/// One sampled, accepted and labelled tab. Serializes to the heartbeat body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    /// Always zero: the server turns consecutive heartbeats into durations
    pub duration: f64,
    pub data: HeartbeatData,
}

impl ActivityEvent {
    /// Build a heartbeat from an accepted snapshot.
    ///
    /// `trackUrls = false` reduces the URL to its origin, `trackTitles = false`
    /// blanks the title. Filtering and categorization have already seen the
    /// full values by the time this runs.
    #[must_use]
    pub fn heartbeat(
        snapshot: &TabSnapshot,
        location: &PageLocation,
        category: Option<String>,
        config: &Config,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (url, path) = if config.track_urls {
            (location.url.clone(), location.path.clone())
        } else {
            (location.origin().to_string(), String::from("/"))
        };
        let title = if config.track_titles {
            snapshot.title.clone().unwrap_or_default()
        } else {
            String::new()
        };

        Self {
            timestamp,
            duration: 0.0,
            data: HeartbeatData {
                url,
                title,
                domain: location.domain.clone(),
                path,
                protocol: location.protocol.clone(),
                category,
                tab_count: snapshot.tab_count,
                audible: snapshot.audible,
                incognito: snapshot.incognito,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(url: &str) -> TabSnapshot {
        TabSnapshot {
            url: Some(url.to_string()),
            title: Some("Fix parser - Pull Request #12".to_string()),
            incognito: false,
            audible: true,
            tab_count: 7,
        }
    }

    #[test]
    fn test_parse_location() {
        let location = PageLocation::parse("https://GitHub.com/user/repo/pull/12?tab=files").unwrap();
        assert_eq!(location.domain, "github.com");
        assert_eq!(location.path, "/user/repo/pull/12");
        assert_eq!(location.protocol, "https");
        assert_eq!(location.origin(), "https://github.com");
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(PageLocation::parse("/just/a/path").is_none());
        assert!(PageLocation::parse("").is_none());
    }

    #[test]
    fn test_heartbeat_wire_shape() {
        let raw = "https://github.com/user/repo/pull/12";
        let location = PageLocation::parse(raw).unwrap();
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let event = ActivityEvent::heartbeat(
            &snapshot(raw),
            &location,
            Some("Work/Development/Code Review".to_string()),
            &Config::default(),
            timestamp,
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T09:30:00Z");
        assert_eq!(json["duration"], 0.0);
        assert_eq!(json["data"]["url"], raw);
        assert_eq!(json["data"]["domain"], "github.com");
        assert_eq!(json["data"]["tabCount"], 7);
        assert_eq!(json["data"]["audible"], true);
        assert_eq!(json["data"]["category"], "Work/Development/Code Review");
    }

    #[test]
    fn test_uncategorized_omits_category() {
        let raw = "https://unknown-domain.example/";
        let location = PageLocation::parse(raw).unwrap();
        let event =
            ActivityEvent::heartbeat(&snapshot(raw), &location, None, &Config::default(), Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["data"].get("category").is_none());
    }

    #[test]
    fn test_tracking_switches_strip_url_and_title() {
        let raw = "https://github.com/secret-org/secret-repo";
        let location = PageLocation::parse(raw).unwrap();
        let config = Config {
            track_urls: false,
            track_titles: false,
            ..Config::default()
        };
        let event = ActivityEvent::heartbeat(&snapshot(raw), &location, None, &config, Utc::now());

        assert_eq!(event.data.url, "https://github.com");
        assert_eq!(event.data.path, "/");
        assert_eq!(event.data.title, "");
        assert_eq!(event.data.domain, "github.com");
    }
}
