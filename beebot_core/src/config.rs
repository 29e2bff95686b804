//! Client configuration.
//!
//! Resolution order: built-in defaults, then `~/.beebot/config.yaml` if it
//! parses, then the `BEEBOT_WEBHOOK_URL` environment variable. A missing or
//! broken config file is logged and ignored.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::webhook::DEFAULT_WEBHOOK_URL;

/// Environment variable overriding the webhook endpoint.
pub const WEBHOOK_URL_ENV: &str = "BEEBOT_WEBHOOK_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint of the automation webhook that produces assistant replies.
    pub webhook_url: String,
    /// Seconds before an in-flight webhook request is cancelled.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            request_timeout_secs: 20,
        }
    }
}

impl Config {
    /// Loads configuration with file and environment overrides applied.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable config file");
                Self::default()
            }),
            _ => Self::default(),
        };
        config.apply_env();
        config
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// `~/.beebot/config.yaml`, when a home directory exists.
    pub fn config_path() -> Option<PathBuf> {
        Some(dirs::home_dir()?.join(".beebot").join("config.yaml"))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.is_empty() {
                self.webhook_url = url;
            }
        }
    }
}
