//! Client-side settings.
//!
//! Reads/writes `~/.shortsns/config.toml`. The session token lives next
//! to it in `session.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shortsns_api::{ApiConfig, DEFAULT_PAGE_SIZE};

/// Client configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL (e.g. "http://localhost:8000/api"). Empty means
    /// `SHORTSNS_API_BASE_URL` or the built-in default.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// Posts per page for feeds and listings.
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Default config file path: ~/.shortsns/config.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Session file that belongs to the config at `config_path`.
    pub fn session_path(config_path: &Path) -> PathBuf {
        match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join("session.json"),
            _ => PathBuf::from("session.json"),
        }
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        if self.server.trim().is_empty() {
            ApiConfig::from_env()
        } else {
            ApiConfig::new(self.server.trim())
        }
    }
}

/// Return the ShortSNS config directory (~/.shortsns).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".shortsns")
}
