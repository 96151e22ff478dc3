//! Daemon configuration
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables. Defaults match the original deployment: notes under `./notes`,
//! a ten minute listing TTL, and the Google Drive document host on the proxy
//! allow-list.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default TTL for cached drive listings (seconds)
const DEFAULT_LISTING_TTL_SECS: u64 = 600;

/// Default timeout for proxied upstream fetches (seconds)
const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 10;

/// One drive folder to list, keyed by its display category
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CategoryConfig {
    /// Display name, e.g. "EJU Past Problems"
    pub category: String,
    /// Drive folder id to query
    pub folder_id: String,
}

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Root directory of the notes tree
    pub notes_root: PathBuf,
    /// TTL for cached drive listings, in seconds
    pub listing_ttl_secs: u64,
    /// Timeout for proxied upstream fetches, in seconds
    pub proxy_timeout_secs: u64,
    /// Hosts the fetch proxy is allowed to contact
    pub allowed_hosts: Vec<String>,
    /// Local path prefix the proxy redirects instead of fetching
    pub static_prefix: String,
    /// Google Drive API key (also via DRIVE_API_KEY env var)
    pub drive_api_key: Option<String>,
    /// Drive folders to list, one per category
    pub categories: Vec<CategoryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 5000).into(),
            notes_root: PathBuf::from("notes"),
            listing_ttl_secs: DEFAULT_LISTING_TTL_SECS,
            proxy_timeout_secs: DEFAULT_PROXY_TIMEOUT_SECS,
            allowed_hosts: vec!["drive.google.com".to_string()],
            static_prefix: "/static/".to_string(),
            drive_api_key: None,
            categories: vec![
                CategoryConfig {
                    category: "EJU Past Problems".to_string(),
                    folder_id: "1ZJ6zQFpYhtKarExGgMN4nyWH2UTT7cvl".to_string(),
                },
                CategoryConfig {
                    category: "Past Problems of J-Universites".to_string(),
                    folder_id: "1kwIwb28AJo2-MhuE9V4pzcDxwXimIUxr".to_string(),
                },
            ],
        }
    }
}

impl Config {
    /// Load configuration from an optional JSON file, then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Environment overrides for deployment knobs
    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.bind_addr.set_port(port);
            }
        }
        if let Ok(root) = std::env::var("NOTES_ROOT") {
            self.notes_root = PathBuf::from(root);
        }
        if let Ok(key) = std::env::var("DRIVE_API_KEY") {
            self.drive_api_key = Some(key);
        }
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }
}
