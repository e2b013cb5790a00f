use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::storage::get_data_dir;

pub const DEVELOPMENT_API_URL: &str = "http://localhost:8000";
pub const PRODUCTION_API_URL: &str = "https://support.example.edu";

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "SUPPORTDESK_API_URL";

/// Backend base URL for the current build mode.
pub fn default_api_url() -> &'static str {
    if cfg!(debug_assertions) {
        DEVELOPMENT_API_URL
    } else {
        PRODUCTION_API_URL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub list_poll_secs: u64,
    pub message_poll_secs: u64,
    pub closed_retention_secs: i64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: default_api_url().to_string(),
            list_poll_secs: 4,
            message_poll_secs: 2,
            closed_retention_secs: 5 * 60,
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Loads `config.json` from the data dir, then applies the environment.
    pub fn load() -> Result<Self> {
        let path = get_data_dir()?.join("config.json");
        let mut config = Self::load_from(&path)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_url = url;
            }
        }
        config.api_url = normalize_base_url(&config.api_url);
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn list_poll_interval(&self) -> Duration {
        Duration::from_secs(self.list_poll_secs.max(1))
    }

    pub fn message_poll_interval(&self) -> Duration {
        Duration::from_secs(self.message_poll_secs.max(1))
    }

    pub fn closed_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.closed_retention_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Strips whitespace and trailing slashes so paths can be appended directly.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
