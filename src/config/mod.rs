//! Configuration management

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::devices::DEFAULT_CODES_URL;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host automation runtime the dispatch sink talks to.
    #[serde(default)]
    pub hass: Option<HassConfig>,

    #[serde(default = "default_codes_url")]
    pub codes_url: String,

    #[serde(default)]
    pub updates: UpdatesConfig,

    /// Remotes to bring up at startup.
    #[serde(default)]
    pub remotes: Vec<RemoteConfig>,
}

fn default_port() -> u16 {
    8124
}

fn default_codes_url() -> String {
    DEFAULT_CODES_URL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct HassConfig {
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatesConfig {
    #[serde(default = "default_true")]
    pub check: bool,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_update_interval")]
    pub interval_minutes: u64,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            check: true,
            branch: default_branch(),
            interval_minutes: default_update_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_update_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub name: String,
    pub device_code: u32,
    /// Controller kind name, e.g. "Broadlink" or "ZHA".
    pub controller: String,
    /// Backend address: entity id, topic, host or IEEE identifier.
    pub controller_data: String,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
}

impl RemoteConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs.max(0.0))
    }
}

fn default_delay_secs() -> f64 {
    0.5
}

/// Get config directory (XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("ICB_CONFIG_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/ir-control-bridge");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return std::path::PathBuf::from(xdg).join("ir-control-bridge");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".config/ir-control-bridge");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return std::path::PathBuf::from(appdata).join("ir-control-bridge");
        }
    }

    // Fallback to current directory
    std::path::PathBuf::from(".")
}

/// Get data directory (XDG_DATA_HOME or platform default); holds the
/// cached device files and the overrides file.
pub fn get_data_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("ICB_DATA_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/ir-control-bridge");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return std::path::PathBuf::from(xdg).join("ir-control-bridge");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".local/share/ir-control-bridge");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("LOCALAPPDATA") {
            return std::path::PathBuf::from(appdata).join("ir-control-bridge");
        }
    }

    // Fallback to ./data
    std::path::PathBuf::from("./data")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let builder = ::config::Config::builder()
        // Start with defaults
        .set_default("port", 8124)?
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (ICB_PORT, ICB_HASS__TOKEN, etc.)
        .add_source(
            ::config::Environment::with_prefix("ICB")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn default_port_without_any_source() {
        env::remove_var("ICB_PORT");
        env::set_var("ICB_CONFIG_DIR", "/tmp/icb-test-nonexistent");

        let config = load_config().expect("config should load");

        env::remove_var("ICB_CONFIG_DIR");

        assert_eq!(config.port, 8124);
        assert!(config.hass.is_none());
        assert!(config.remotes.is_empty());
        assert!(config.updates.check);
    }

    #[test]
    #[serial]
    fn port_env_override() {
        env::set_var("ICB_PORT", "3000");
        env::set_var("ICB_CONFIG_DIR", "/tmp/icb-test-nonexistent");

        let config = load_config().expect("config should load");

        env::remove_var("ICB_PORT");
        env::remove_var("ICB_CONFIG_DIR");

        assert_eq!(config.port, 3000);
    }

    #[test]
    #[serial]
    fn config_file_declares_remotes() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(
            temp_dir.path().join("config.toml"),
            r#"
port = 9000

[hass]
base_url = "http://hass.local:8123"
token = "secret"

[[remotes]]
name = "living_room_tv"
device_code = 1060
controller = "Broadlink"
controller_data = "remote.rm4_pro"
delay_secs = 0.4

[[remotes]]
name = "bedroom_ac"
device_code = 2001
controller = "ZHA"
controller_data = "00:12:4b:00:22:33:44:55"
"#,
        )
        .expect("write config file");

        env::set_var("ICB_CONFIG_DIR", temp_dir.path());

        let config = load_config().expect("config should load");

        env::remove_var("ICB_CONFIG_DIR");

        assert_eq!(config.port, 9000);
        let hass = config.hass.expect("hass section");
        assert_eq!(hass.base_url, "http://hass.local:8123");
        assert_eq!(config.remotes.len(), 2);
        assert_eq!(config.remotes[0].name, "living_room_tv");
        assert!((config.remotes[0].delay_secs - 0.4).abs() < f64::EPSILON);
        // Default delay applies when omitted.
        assert!((config.remotes[1].delay_secs - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    #[serial]
    fn data_dir_env_override() {
        env::set_var("ICB_DATA_DIR", "/tmp/icb-data");
        assert_eq!(get_data_dir(), std::path::PathBuf::from("/tmp/icb-data"));
        env::remove_var("ICB_DATA_DIR");
    }

    #[test]
    fn negative_delay_clamps_to_zero() {
        let remote = RemoteConfig {
            name: "r".into(),
            device_code: 1,
            controller: "MQTT".into(),
            controller_data: "tele/ir".into(),
            delay_secs: -1.0,
        };
        assert_eq!(remote.delay(), Duration::ZERO);
    }
}
