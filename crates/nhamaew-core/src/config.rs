//! Application configuration management.
//!
//! Holds the backend base URL, request timeout, LIFF app id and the last
//! signed-in LINE user. Stored at `~/.config/nhamaew/config.json`; the
//! `NHAMAEW_API_URL` and `NHAMAEW_LIFF_ID` environment variables override
//! the file (the binary loads `.env` first).

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::DEFAULT_TIMEOUT_SECS;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "nhamaew";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "NHAMAEW_API_URL";
pub const ENV_LIFF_ID: &str = "NHAMAEW_LIFF_ID";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Links opened inside LINE go through the LIFF app launcher.
const LIFF_LAUNCH_URL: &str = "https://liff.line.me";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub liff_id: Option<String>,
    pub last_line_user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            liff_id: None,
            last_line_user_id: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_blank(ENV_API_URL) {
            debug!(url = %url, "API base URL from environment");
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(liff_id) = non_blank(ENV_LIFF_ID) {
            self.liff_id = Some(liff_id);
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Base URL for links shared to LINE chats: the LIFF app when one is
    /// configured, otherwise the backend host.
    pub fn share_base_url(&self) -> String {
        match self.liff_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(liff_id) => format!("{}/{}", LIFF_LAUNCH_URL, liff_id),
            None => self.api_base_url.clone(),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
