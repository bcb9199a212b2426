//! Control/Status message contract shared by the browser UI and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    config::{Config, SettingsPatch, SettingsStore},
    dispatcher::{ConnectionState, Dispatcher},
    error::ControlError,
    observer::Trigger,
};

const OPERATIONS: &[&str] = &[
    "getStatus",
    "setEnabled",
    "getSettings",
    "saveSettings",
    "testConnection",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlRequest {
    GetStatus,
    SetEnabled { enabled: bool },
    GetSettings,
    SaveSettings { settings: SettingsPatch },
    TestConnection,
}

impl ControlRequest {
    /// Decode a request, telling an unknown operation apart from a malformed
    /// known one.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::UnknownOperation`] when `type` names no known
    /// operation, [`ControlError::InvalidRequest`] when the body does not fit it.
    pub fn parse(value: Value) -> Result<Self, ControlError> {
        let operation = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ControlError::InvalidRequest("missing 'type'".to_string()))?;
        if !OPERATIONS.contains(&operation) {
            return Err(ControlError::UnknownOperation(operation.to_string()));
        }
        serde_json::from_value(value).map_err(|e| ControlError::InvalidRequest(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlResponse {
    Status {
        enabled: bool,
        connected: bool,
        #[serde(rename = "lastHeartbeatTimestamp")]
        last_heartbeat: Option<DateTime<Utc>>,
        current_url: Option<String>,
        bucket_id: Option<String>,
    },
    Enabled {
        enabled: bool,
    },
    Settings {
        settings: Config,
    },
    Saved {
        settings: Config,
    },
    Connection {
        connected: bool,
    },
    Error {
        kind: String,
        message: String,
    },
}

impl From<ControlError> for ControlResponse {
    fn from(error: ControlError) -> Self {
        Self::Error {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Executes control requests against the running agent
#[derive(Clone)]
pub struct Controller {
    settings: Arc<SettingsStore>,
    dispatcher: Dispatcher,
    triggers: UnboundedSender<Trigger>,
}

impl Controller {
    #[must_use]
    pub fn new(
        settings: Arc<SettingsStore>,
        dispatcher: Dispatcher,
        triggers: UnboundedSender<Trigger>,
    ) -> Self {
        Self {
            settings,
            dispatcher,
            triggers,
        }
    }

    /// Decode and execute a raw message. Every failure becomes an `error`
    /// response.
    pub async fn handle_value(&self, value: Value) -> ControlResponse {
        let result = match ControlRequest::parse(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            log::warn!("Control request rejected: {e}");
            e.into()
        })
    }

    /// Execute one request.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Failed`] if the settings could not be persisted.
    pub async fn handle(&self, request: ControlRequest) -> Result<ControlResponse, ControlError> {
        log::debug!("Control request: {request:?}");
        match request {
            ControlRequest::GetStatus => {
                let config = self.settings.current().await;
                let status = self.dispatcher.status().await;
                Ok(ControlResponse::Status {
                    enabled: config.enabled,
                    connected: status.connection == ConnectionState::Connected,
                    last_heartbeat: status.last_heartbeat,
                    current_url: status.current_url,
                    bucket_id: status.bucket_id,
                })
            }
            ControlRequest::SetEnabled { enabled } => {
                let previous = self
                    .settings
                    .set_enabled(enabled)
                    .await
                    .map_err(|e| ControlError::Failed(format!("{e:#}")))?;
                log::info!("Tracking {}", if enabled { "enabled" } else { "disabled" });
                if enabled && !previous && self.triggers.send(Trigger::Reenabled).is_err() {
                    log::warn!("Agent loop is gone, re-enable cycle not started");
                }
                Ok(ControlResponse::Enabled { enabled })
            }
            ControlRequest::GetSettings => Ok(ControlResponse::Settings {
                settings: self.settings.current().await,
            }),
            ControlRequest::SaveSettings { settings } => {
                let saved = self
                    .settings
                    .save(settings)
                    .await
                    .map_err(|e| ControlError::Failed(format!("{e:#}")))?;
                log::info!("Settings saved (revision {})", self.settings.revision());
                Ok(ControlResponse::Saved { settings: saved })
            }
            ControlRequest::TestConnection => Ok(ControlResponse::Connection {
                connected: self.dispatcher.ensure_bucket().await,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockServer;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

    fn controller(server: &Arc<MockServer>) -> (Controller, UnboundedReceiver<Trigger>) {
        let settings = Arc::new(SettingsStore::in_memory(Config::default()));
        let dispatcher = Dispatcher::with_retry_delay(
            server.clone(),
            settings.clone(),
            Duration::from_secs(3600),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        (Controller::new(settings, dispatcher, tx), rx)
    }

    #[test]
    fn test_parse_known_requests() {
        assert_eq!(
            ControlRequest::parse(json!({"type": "getStatus"})).unwrap(),
            ControlRequest::GetStatus
        );
        assert_eq!(
            ControlRequest::parse(json!({"type": "setEnabled", "enabled": false})).unwrap(),
            ControlRequest::SetEnabled { enabled: false }
        );
        let ControlRequest::SaveSettings { settings } = ControlRequest::parse(
            json!({"type": "saveSettings", "settings": {"trackTitles": false}}),
        )
        .unwrap() else {
            panic!("expected saveSettings");
        };
        assert_eq!(settings.track_titles, Some(false));
        assert_eq!(settings.server_url, None);
    }

    #[test]
    fn test_parse_distinguishes_unknown_from_invalid() {
        assert_eq!(
            ControlRequest::parse(json!({"type": "reboot"})),
            Err(ControlError::UnknownOperation("reboot".to_string()))
        );
        assert!(matches!(
            ControlRequest::parse(json!({"type": "setEnabled"})),
            Err(ControlError::InvalidRequest(_))
        ));
        assert!(matches!(
            ControlRequest::parse(json!({"enabled": true})),
            Err(ControlError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_operation_yields_error_response() {
        let (controller, _rx) = controller(&MockServer::online("laptop"));
        let response = controller
            .handle_value(json!({"type": "exportAll"}))
            .await;
        let ControlResponse::Error { kind, message } = response else {
            panic!("expected error response");
        };
        assert_eq!(kind, "unknownOperation");
        assert!(message.contains("exportAll"));
    }

    #[tokio::test]
    async fn test_reenable_triggers_exactly_one_cycle() {
        let (controller, mut rx) = controller(&MockServer::online("laptop"));

        controller
            .handle(ControlRequest::SetEnabled { enabled: false })
            .await
            .unwrap();
        controller
            .handle(ControlRequest::SetEnabled { enabled: true })
            .await
            .unwrap();

        assert_eq!(rx.try_recv(), Ok(Trigger::Reenabled));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_enable_while_enabled_does_not_trigger() {
        let (controller, mut rx) = controller(&MockServer::online("laptop"));
        controller
            .handle(ControlRequest::SetEnabled { enabled: true })
            .await
            .unwrap();
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_status_reflects_connection() {
        let server = MockServer::online("laptop");
        let (controller, _rx) = controller(&server);

        let ControlResponse::Status {
            enabled,
            connected,
            bucket_id,
            ..
        } = controller.handle(ControlRequest::GetStatus).await.unwrap()
        else {
            panic!("expected status");
        };
        assert!(enabled);
        assert!(!connected);
        assert_eq!(bucket_id, None);

        assert_eq!(
            controller.handle(ControlRequest::TestConnection).await.unwrap(),
            ControlResponse::Connection { connected: true }
        );
        let ControlResponse::Status {
            connected,
            bucket_id,
            ..
        } = controller.handle(ControlRequest::GetStatus).await.unwrap()
        else {
            panic!("expected status");
        };
        assert!(connected);
        assert_eq!(bucket_id.as_deref(), Some("aw-watcher-web-enhanced_laptop"));
    }

    #[tokio::test]
    async fn test_connection_reports_failure() {
        let (controller, _rx) = controller(&MockServer::offline("laptop"));
        assert_eq!(
            controller.handle(ControlRequest::TestConnection).await.unwrap(),
            ControlResponse::Connection { connected: false }
        );
    }

    #[tokio::test]
    async fn test_save_settings_merges_without_reconnecting() {
        let server = MockServer::online("laptop");
        let (controller, mut rx) = controller(&server);

        let response = controller
            .handle_value(json!({
                "type": "saveSettings",
                "settings": {"excludeDomains": ["bank.example"], "serverUrl": "http://aw:5666"}
            }))
            .await;
        let ControlResponse::Saved { settings } = response else {
            panic!("expected saved");
        };
        assert_eq!(settings.server_url, "http://aw:5666");
        assert!(settings.exclude_domains.contains("bank.example"));
        assert!(settings.track_urls);

        assert_eq!(server.info_calls(), 0);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        let ControlResponse::Settings { settings } =
            controller.handle(ControlRequest::GetSettings).await.unwrap()
        else {
            panic!("expected settings");
        };
        assert_eq!(settings.server_url, "http://aw:5666");
    }

    #[test]
    fn test_response_wire_shape() {
        let json = serde_json::to_value(ControlResponse::Status {
            enabled: true,
            connected: false,
            last_heartbeat: None,
            current_url: Some("https://github.com/".to_string()),
            bucket_id: None,
        })
        .unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["currentUrl"], "https://github.com/");
        assert!(json["lastHeartbeatTimestamp"].is_null());
        assert!(json.get("lastHeartbeat").is_none());
    }

    #[test]
    fn test_status_timestamp_key() {
        let ts = "2026-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let json = serde_json::to_value(ControlResponse::Status {
            enabled: true,
            connected: true,
            last_heartbeat: Some(ts),
            current_url: None,
            bucket_id: Some("aw-watcher-web-chrome_host".to_string()),
        })
        .unwrap();
        assert_eq!(json["lastHeartbeatTimestamp"], "2026-03-01T12:00:00Z");
        assert_eq!(json["bucketId"], "aw-watcher-web-chrome_host");

        let back: ControlResponse = serde_json::from_value(json).unwrap();
        assert!(matches!(
            back,
            ControlResponse::Status { last_heartbeat: Some(t), .. } if t == ts
        ));
    }
}
