//! Configuration loading and persistence.
//!
//! Settings are read once at startup from `config.json` in the config
//! directory, then environment variables override individual fields. A
//! missing or unreadable file falls back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Environment variable that enables immediate payload delivery when set to `"true"`.
pub const ENV_IMMEDIATE_PAYLOAD_DELIVERY: &str = "PUSHBRIDGE_IMMEDIATE_PAYLOAD_DELIVERY";

/// Configuration for the bridge.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Deliver payloads while the app is backgrounded instead of buffering.
    pub immediate_payload_delivery: bool,
    /// Id of the channel created at startup as the default.
    pub default_channel_id: String,
    /// Name of the default channel.
    pub default_channel_name: String,
    /// Whether the platform supports notification channels.
    pub channels_supported: bool,
    /// Application package, used to resolve bundled sound resources.
    pub package_name: String,
    /// Prefix for global calls into the presentation surface.
    pub script_namespace: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            immediate_payload_delivery: false,
            default_channel_id: "fcm_default_channel".to_string(),
            default_channel_name: "Default".to_string(),
            channels_supported: true,
            package_name: "com.example.app".to_string(),
            script_namespace: "PushBridge.".to_string(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// `PUSHBRIDGE_CONFIG_DIR` overrides the platform config directory.
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("PUSHBRIDGE_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("pushbridge")
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from the config directory, with environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let mut config = Self::load_from(&path).unwrap_or_else(|e| {
            log::debug!("Using default config ({e:#})");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from an explicit file, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Persists the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the process environment in production).
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_IMMEDIATE_PAYLOAD_DELIVERY) {
            self.immediate_payload_delivery = value == "true";
        }

        if let Some(id) = lookup("PUSHBRIDGE_DEFAULT_CHANNEL_ID") {
            self.default_channel_id = id;
        }

        if let Some(name) = lookup("PUSHBRIDGE_DEFAULT_CHANNEL_NAME") {
            self.default_channel_name = name;
        }

        if let Some(supported) = lookup("PUSHBRIDGE_CHANNELS_SUPPORTED") {
            if let Ok(supported) = supported.parse::<bool>() {
                self.channels_supported = supported;
            }
        }

        if let Some(package) = lookup("PUSHBRIDGE_PACKAGE_NAME") {
            self.package_name = package;
        }
    }
}
