//! Remote handles - a configured device definition wired to its
//! constructed controller.
//!
//! A remote owns the merged command table (shipped commands plus user
//! overrides) and routes named sends, raw sends and learn requests
//! through the controller built for it at startup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::RemoteConfig;
use crate::controllers::{
    Command, Controller, ControllerKind, ControllerRegistry, ControllerSpec, Encoding,
};
use crate::devices::{DeviceConfig, DeviceStore};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

/// Domain under which remote-type device files and overrides are stored.
const REMOTE_DOMAIN: &str = "remote";

/// Errors from remote operations, kept apart so the API layer can map
/// them onto status codes.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("failed to persist command: {0}")]
    Store(anyhow::Error),
}

pub struct Remote {
    pub name: String,
    pub device_code: u32,
    pub manufacturer: String,
    pub supported_models: Vec<String>,
    pub kind: ControllerKind,
    pub encoding: Encoding,
    delay: Duration,
    commands: RwLock<HashMap<String, Command>>,
    controller: Box<dyn Controller>,
}

/// Listing shape served by the API.
#[derive(Debug, Serialize)]
pub struct RemoteSummary {
    pub name: String,
    pub device_code: u32,
    pub manufacturer: String,
    pub supported_models: Vec<String>,
    pub controller: ControllerKind,
    pub commands_encoding: Encoding,
    pub commands: Vec<String>,
}

impl Remote {
    /// Wire a configured remote to its device definition, constructing
    /// the controller through the registry.
    pub fn build(
        config: &RemoteConfig,
        device: DeviceConfig,
        registry: &ControllerRegistry,
        sink: Arc<dyn DispatchSink>,
    ) -> Result<Self, ControllerError> {
        let kind: ControllerKind = config.controller.parse()?;
        if kind != device.supported_controller {
            warn!(
                remote = %config.name,
                configured = %kind,
                device_file = %device.supported_controller,
                "configured controller differs from the device file"
            );
        }

        let spec = ControllerSpec {
            kind,
            encoding: device.commands_encoding,
            controller_data: config.controller_data.clone(),
            delay: config.delay(),
        };
        let controller = registry.make(spec, sink)?;

        Ok(Self {
            name: config.name.clone(),
            device_code: config.device_code,
            manufacturer: device.manufacturer,
            supported_models: device.supported_models,
            kind,
            encoding: device.commands_encoding,
            delay: config.delay(),
            commands: RwLock::new(device.commands),
            controller,
        })
    }

    pub async fn summary(&self) -> RemoteSummary {
        let mut commands: Vec<String> = {
            let table = self.commands.read().await;
            table.keys().cloned().collect()
        };
        commands.sort();

        RemoteSummary {
            name: self.name.clone(),
            device_code: self.device_code,
            manufacturer: self.manufacturer.clone(),
            supported_models: self.supported_models.clone(),
            controller: self.kind,
            commands_encoding: self.encoding,
            commands,
        }
    }

    /// Send named commands in order, spacing them by the configured
    /// delay. Fails before dispatching anything for an unknown name.
    pub async fn send_named(&self, names: &[String]) -> Result<(), RemoteError> {
        let mut resolved = Vec::with_capacity(names.len());
        {
            let table = self.commands.read().await;
            for name in names {
                let command = table
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RemoteError::UnknownCommand(name.clone()))?;
                resolved.push(command);
            }
        }

        for (i, command) in resolved.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }
            self.controller.send(command).await?;
        }
        Ok(())
    }

    /// Send a payload as-is, bypassing the command table.
    pub async fn send_raw(&self, command: &Command) -> Result<(), RemoteError> {
        self.controller.send(command).await?;
        Ok(())
    }

    /// Capture a code from the device and store it under `name`.
    /// Returns the code, or `None` when nothing was captured before the
    /// controller's deadline (nothing is stored in that case).
    pub async fn learn_into(
        &self,
        name: &str,
        store: &DeviceStore,
    ) -> Result<Option<String>, RemoteError> {
        let Some(code) = self.controller.learn().await? else {
            return Ok(None);
        };

        let command = Command::Single(code.clone());
        {
            let mut table = self.commands.write().await;
            table.insert(name.to_string(), command.clone());
        }
        store
            .save_command(REMOTE_DOMAIN, self.device_code, name, command)
            .await
            .map_err(RemoteError::Store)?;

        Ok(Some(code))
    }

    /// Remove `name` from the live table and the override store.
    /// Returns false when the name was not present.
    pub async fn delete_command(
        &self,
        name: &str,
        store: &DeviceStore,
    ) -> Result<bool, RemoteError> {
        let removed = {
            let mut table = self.commands.write().await;
            table.remove(name).is_some()
        };
        if removed {
            store
                .delete_command(REMOTE_DOMAIN, self.device_code, name)
                .await
                .map_err(RemoteError::Store)?;
        }
        Ok(removed)
    }
}
