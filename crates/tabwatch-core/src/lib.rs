pub mod agent;
pub mod categorizer;
pub mod client;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod host;
pub mod ipc;
pub mod observer;
pub mod privacy;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, CycleOutcome};
pub use client::AwServerClient;
pub use config::{Config, SettingsPatch, SettingsStore};
pub use control::{ControlRequest, ControlResponse, Controller};
pub use dispatcher::{ConnectionState, Dispatcher};
pub use host::NativeHost;
pub use observer::TabObserver;
