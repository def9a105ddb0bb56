//! Device-definition store.
//!
//! Device definitions are JSON files keyed by a numeric device code,
//! fetched from the code repository on first use and cached under the
//! data directory. Learned and edited commands live in a separate
//! overrides file and are merged over the shipped commands at load time,
//! so updating a cached definition never loses user data.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::controllers::{Command, ControllerKind, Encoding};

/// Default location of the shipped device-code files.
pub const DEFAULT_CODES_URL: &str =
    "https://raw.githubusercontent.com/open-horizon-labs/ir-control-bridge/master/codes";

/// A device-definition record as shipped in the code files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub manufacturer: String,
    #[serde(default)]
    pub supported_models: Vec<String>,
    pub supported_controller: ControllerKind,
    pub commands_encoding: Encoding,
    #[serde(default)]
    pub commands: HashMap<String, Command>,
}

/// Per-device user overrides; only commands are overridable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DeviceOverride {
    #[serde(default)]
    commands: HashMap<String, Command>,
}

/// domain -> device code -> override
type Overrides = HashMap<String, HashMap<String, DeviceOverride>>;

/// Store for device definitions and user overrides.
pub struct DeviceStore {
    data_dir: PathBuf,
    codes_url: String,
    client: reqwest::Client,
    overrides: RwLock<Overrides>,
}

impl DeviceStore {
    /// Create a store rooted at `data_dir`, loading any existing
    /// overrides from disk.
    pub fn new(data_dir: PathBuf, codes_url: impl Into<String>) -> Self {
        let overrides = Self::load_overrides(&data_dir);

        #[allow(clippy::expect_used)] // HTTP client creation only fails if TLS setup fails
        let client = reqwest::Client::builder()
            .user_agent("ir-control-bridge")
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            data_dir,
            codes_url: codes_url.into(),
            client,
            overrides: RwLock::new(overrides),
        }
    }

    fn overrides_file(&self) -> PathBuf {
        self.data_dir.join("overrides.json")
    }

    fn device_file(&self, domain: &str, device_code: u32) -> PathBuf {
        self.data_dir
            .join("codes")
            .join(domain)
            .join(format!("{device_code}.json"))
    }

    fn load_overrides(data_dir: &PathBuf) -> Overrides {
        let path = data_dir.join("overrides.json");
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(overrides) = serde_json::from_str(&content) {
                return overrides;
            }
            tracing::warn!("overrides file is unreadable, starting empty: {}", path.display());
        }
        Overrides::new()
    }

    async fn save_overrides(&self) -> Result<()> {
        let overrides = self.overrides.read().await;
        let json = serde_json::to_string_pretty(&*overrides)?;
        drop(overrides);

        let path = self.overrides_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Fetch a device file from the code repository into the local cache.
    async fn download_device(&self, domain: &str, device_code: u32) -> Result<()> {
        let url = format!("{}/{}/{}.json", self.codes_url, domain, device_code);
        tracing::warn!(
            "device file for code {device_code} not cached, downloading from {url}"
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "device file download failed: {} for {url}",
                response.status()
            ));
        }
        let bytes = response.bytes().await?;

        let path = self.device_file(domain, device_code);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;

        tracing::info!("cached device file {}", path.display());
        Ok(())
    }

    /// Load a device definition with user overrides applied.
    pub async fn load(&self, domain: &str, device_code: u32) -> Result<DeviceConfig> {
        let path = self.device_file(domain, device_code);
        if !path.exists() {
            self.download_device(domain, device_code).await?;
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut device: DeviceConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;

        let overrides = self.overrides.read().await;
        if let Some(device_override) = overrides
            .get(domain)
            .and_then(|domain_data| domain_data.get(&device_code.to_string()))
        {
            for (name, command) in &device_override.commands {
                device.commands.insert(name.clone(), command.clone());
            }
        }

        Ok(device)
    }

    /// Persist a learned or edited command into the override layer.
    pub async fn save_command(
        &self,
        domain: &str,
        device_code: u32,
        name: &str,
        command: Command,
    ) -> Result<()> {
        {
            let mut overrides = self.overrides.write().await;
            overrides
                .entry(domain.to_string())
                .or_default()
                .entry(device_code.to_string())
                .or_default()
                .commands
                .insert(name.to_string(), command);
        }
        self.save_overrides().await
    }

    /// Drop a command from the override layer. Shipped commands are
    /// untouched; deleting a name that only exists in the shipped file is
    /// a no-op here.
    pub async fn delete_command(&self, domain: &str, device_code: u32, name: &str) -> Result<()> {
        {
            let mut overrides = self.overrides.write().await;
            if let Some(device_override) = overrides
                .get_mut(domain)
                .and_then(|domain_data| domain_data.get_mut(&device_code.to_string()))
            {
                device_override.commands.remove(name);
            }
        }
        self.save_overrides().await
    }
}
