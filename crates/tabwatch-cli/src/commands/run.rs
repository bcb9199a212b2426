/// Agent process: native messaging on stdio plus the control socket
use anyhow::{Context, Result};
use std::sync::Arc;
use tabwatch_core::{
    config::get_data_dir,
    ipc::{listen, socket_path},
    Agent, AwServerClient, Controller, Dispatcher, NativeHost, SettingsStore, TabObserver,
};
use tokio::sync::mpsc;

pub async fn run_agent() -> Result<()> {
    setup_agent_logging().context("Failed to set up agent logging")?;
    log::info!("Agent process started (v{})", env!("CARGO_PKG_VERSION"));

    if let Err(e) = agent_main_logic().await {
        log::error!("Agent exited with a fatal error: {e:#}");
        return Err(e);
    }
    Ok(())
}

async fn agent_main_logic() -> Result<()> {
    let settings = Arc::new(SettingsStore::load(
        get_data_dir()?.join("settings.json"),
    )?);

    let server = Arc::new(AwServerClient::new(settings.clone())?);
    let dispatcher = Dispatcher::new(server, settings.clone());
    dispatcher.start();

    let (triggers, trigger_rx) = mpsc::unbounded_channel();
    let controller = Controller::new(settings.clone(), dispatcher.clone(), triggers.clone());

    let sock_path = socket_path()?;
    let ipc_controller = controller.clone();
    let listen_path = sock_path.clone();
    tokio::spawn(async move {
        if let Err(e) = listen(ipc_controller, &listen_path).await {
            log::error!("IPC listener failed: {e}");
        }
    });

    let observer = TabObserver::new();
    let host = NativeHost::new(observer.clone(), controller, triggers);
    let mut agent = Agent::new(settings, Arc::new(observer), dispatcher, trigger_rx);

    let result = tokio::select! {
        result = agent.run() => result,
        result = host.serve(tokio::io::stdin(), tokio::io::stdout()) => {
            result.context("Native messaging channel failed")
        }
    };

    if let Err(e) = std::fs::remove_file(&sock_path) {
        log::debug!("Could not remove {}: {e}", sock_path.display());
    }
    log::info!("Agent stopped");
    result
}

fn setup_agent_logging() -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = get_data_dir()?.join("agent.log");

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}
