//! Configuration loading and persistence.
//!
//! A client can be configured entirely in code through
//! [`crate::ClientBuilder`]; `Config` is the file/env layer on top for
//! binaries that prefer not to hard-code their application id.
//!
//! Load order:
//! 1. Defaults
//! 2. `<config dir>/presence-ipc/config.json`, if present
//! 3. `PRESENCE_IPC_*` environment variables

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PRESENCE_INTERVAL, DEFAULT_READ_INTERVAL};

/// Client configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Application id sent in the handshake.
    pub app_id: String,
    /// Read Loop period in milliseconds.
    pub read_interval_ms: u64,
    /// Presence Scheduler period in seconds.
    pub presence_interval_secs: u64,
    /// Register the launch URL scheme when the client is built.
    pub auto_register: bool,
    /// Platform (Steam) game id used for launch registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_game_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            read_interval_ms: DEFAULT_READ_INTERVAL.as_millis() as u64,
            presence_interval_secs: DEFAULT_PRESENCE_INTERVAL.as_secs(),
            auto_register: true,
            platform_game_id: None,
        }
    }
}

impl Config {
    /// Configuration for `app_id` with default timings.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    /// Returns the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("presence-ipc"))
    }

    /// Loads configuration from the default file, with environment variable
    /// overrides. A missing file is not an error.
    pub fn load() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let mut config = if path.exists() {
            Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("[Config] Ignoring {}: {e:#}", path.display());
                Self::default()
            })
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from an explicit file (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parse config file {}", path.display()))
    }

    /// Persists the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `PRESENCE_IPC_*` overrides from `lookup`. Unparseable numbers
    /// and booleans are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(app_id) = lookup("PRESENCE_IPC_APP_ID") {
            self.app_id = app_id;
        }

        if let Some(interval) = lookup("PRESENCE_IPC_READ_INTERVAL_MS") {
            if let Ok(ms) = interval.parse::<u64>() {
                self.read_interval_ms = ms;
            }
        }

        if let Some(interval) = lookup("PRESENCE_IPC_PRESENCE_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                self.presence_interval_secs = secs;
            }
        }

        if let Some(flag) = lookup("PRESENCE_IPC_AUTO_REGISTER") {
            match flag.as_str() {
                "1" | "true" | "yes" => self.auto_register = true,
                "0" | "false" | "no" => self.auto_register = false,
                _ => {}
            }
        }

        if let Some(game_id) = lookup("PRESENCE_IPC_STEAM_ID") {
            self.platform_game_id = Some(game_id).filter(|id| !id.is_empty());
        }
    }

    /// Read Loop period.
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    /// Presence Scheduler period.
    pub fn presence_interval(&self) -> Duration {
        Duration::from_secs(self.presence_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.read_interval(), Duration::from_millis(1000));
        assert_eq!(config.presence_interval(), Duration::from_secs(15));
        assert!(config.auto_register);
        assert!(config.platform_game_id.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");

        let mut config = Config::new("1234");
        config.platform_game_id = Some("570".to_string());
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"app_id": "99"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.app_id, "99");
        assert_eq!(config.read_interval_ms, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PRESENCE_IPC_APP_ID", "abc"),
            ("PRESENCE_IPC_READ_INTERVAL_MS", "250"),
            ("PRESENCE_IPC_PRESENCE_INTERVAL_SECS", "not-a-number"),
            ("PRESENCE_IPC_AUTO_REGISTER", "false"),
            ("PRESENCE_IPC_STEAM_ID", "730"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.app_id, "abc");
        assert_eq!(config.read_interval_ms, 250);
        assert_eq!(config.presence_interval_secs, 15);
        assert!(!config.auto_register);
        assert_eq!(config.platform_game_id.as_deref(), Some("730"));
    }
}
