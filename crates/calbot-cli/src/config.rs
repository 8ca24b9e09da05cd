//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calbot/config.toml` by default:
//!
//! ```toml
//! [server]
//! address = "0.0.0.0:8080"
//! base_url = "https://www.littlerocksoiree.com"
//! cache_ttl = 900
//!
//! [output]
//! format = "json"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use calbot_core::DEFAULT_CALENDAR_NAME;
use calbot_server::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT, ServerConfig};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerSettings,
    pub output: OutputSettings,
}

/// Settings for `calbot serve` and for fetching guides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to listen on.
    pub address: SocketAddr,

    /// Root of the guide site.
    pub base_url: String,

    pub user_agent: String,

    /// Guide request timeout in seconds.
    pub timeout: u64,

    /// Seconds an extracted guide stays cached.
    pub cache_ttl: u64,

    /// Number of guides kept in memory.
    pub cache_capacity: usize,

    pub calendar_name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            address: defaults.listen_addr,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: defaults.request_timeout.as_secs(),
            cache_ttl: defaults.cache_ttl.as_secs(),
            cache_capacity: defaults.cache_capacity,
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Format used by `calbot extract` when `--format` is not given.
    pub format: OutputFormat,
}

/// How extracted events are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// iCalendar feed.
    #[default]
    Ics,
    /// Pretty-printed JSON array.
    Json,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if there is no file.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calbot")
    }

    /// Builds the server configuration these settings describe.
    pub fn to_server_config(&self) -> ClientResult<ServerConfig> {
        let settings = &self.server;
        let config = ServerConfig::new(settings.address)
            .with_base_url(&settings.base_url)
            .map_err(|e| ClientError::Config(e.to_string()))?
            .with_user_agent(&settings.user_agent)
            .with_request_timeout(Duration::from_secs(settings.timeout))
            .with_cache_ttl(Duration::from_secs(settings.cache_ttl))
            .with_cache_capacity(settings.cache_capacity)
            .with_calendar_name(&settings.calendar_name);
        Ok(config)
    }
}
