/// Commands that talk to the running agent over the control socket
use anyhow::Result;
use tabled::Table;
use tabwatch_core::{
    ipc::{socket_path, IpcClient},
    ControlRequest, ControlResponse, SettingsPatch,
};

use super::settings::setting_rows;

async fn request(request: ControlRequest) -> Result<ControlResponse> {
    let client = IpcClient::new(&socket_path()?);
    match client.send(&request).await? {
        ControlResponse::Error { kind, message } => {
            anyhow::bail!("Agent rejected the request ({kind}): {message}")
        }
        response => Ok(response),
    }
}

fn unexpected(response: &ControlResponse) -> anyhow::Error {
    anyhow::anyhow!("Unexpected response from agent: {response:?}")
}

pub async fn show_status() -> Result<()> {
    match request(ControlRequest::GetStatus).await {
        Ok(ControlResponse::Status {
            enabled,
            connected,
            last_heartbeat,
            current_url,
            bucket_id,
        }) => {
            println!("Agent Status: Running");
            println!("Tracking: {}", if enabled { "ACTIVE" } else { "PAUSED" });
            println!(
                "Server: {}",
                if connected { "connected" } else { "disconnected" }
            );
            println!("Bucket: {}", bucket_id.as_deref().unwrap_or("(not resolved)"));
            match last_heartbeat {
                Some(ts) => println!("Last heartbeat: {}", ts.to_rfc3339()),
                None => println!("Last heartbeat: never"),
            }
            println!("Current URL: {}", current_url.as_deref().unwrap_or("-"));
        }
        Ok(other) => return Err(unexpected(&other)),
        Err(e) => {
            log::error!("Failed to get status: {e:#}");
            println!("Agent Status: Not running (or not responding)");
        }
    }
    Ok(())
}

pub async fn set_enabled(enabled: bool) -> Result<()> {
    match request(ControlRequest::SetEnabled { enabled }).await? {
        ControlResponse::Enabled { enabled } => {
            println!("Tracking {}", if enabled { "resumed" } else { "paused" });
            Ok(())
        }
        other => Err(unexpected(&other)),
    }
}

pub async fn show_settings(json: bool) -> Result<()> {
    match request(ControlRequest::GetSettings).await? {
        ControlResponse::Settings { settings } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("{}", Table::new(setting_rows(&settings)));
            }
            Ok(())
        }
        other => Err(unexpected(&other)),
    }
}

pub async fn save_settings(patch: SettingsPatch) -> Result<()> {
    match request(ControlRequest::SaveSettings { settings: patch }).await? {
        ControlResponse::Saved { settings } => {
            println!("Settings saved");
            println!("{}", Table::new(setting_rows(&settings)));
            Ok(())
        }
        other => Err(unexpected(&other)),
    }
}

pub async fn test_connection() -> Result<()> {
    match request(ControlRequest::TestConnection).await? {
        ControlResponse::Connection { connected: true } => {
            println!("Connected to server");
            Ok(())
        }
        ControlResponse::Connection { connected: false } => {
            anyhow::bail!("Server unreachable; the agent will keep retrying")
        }
        other => Err(unexpected(&other)),
    }
}
