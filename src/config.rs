//! Configuration for the chat server
//!
//! Defaults can be overridden by an optional TOML file and then by
//! environment variables:
//!
//! - `CHAT_CONFIG`           path to a TOML file (optional)
//! - `CHAT_BIND_ADDR`        (default: "0.0.0.0:9090")
//! - `CHAT_MAX_CLIENTS`      (default: "10")
//! - `CHAT_MAX_LINE_LENGTH`  (default: "1024")
//! - `CHAT_LOG_PATH`         (default: "server_chat.log", empty disables it)

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::chat_log::DEFAULT_LOG_PATH;
use crate::error::ConfigError;
use crate::registry::DEFAULT_MAX_CLIENTS;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9090";

/// Default maximum inbound line length in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to listen on, `host:port`
    pub bind_addr: String,

    /// Maximum number of simultaneously registered clients
    pub max_clients: usize,

    /// Longest accepted inbound line; longer lines end the connection
    pub max_line_length: usize,

    /// Chat log file; `None` disables logging of broadcasts
    pub chat_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_clients: DEFAULT_MAX_CLIENTS,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            chat_log: Some(PathBuf::from(DEFAULT_LOG_PATH)),
        }
    }
}

impl Config {
    /// Build the configuration from `CHAT_CONFIG` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = match env::var("CHAT_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.with_env_overrides()?.validated()
    }

    /// Parse a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text; missing keys take their defaults
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `CHAT_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(addr) = env::var("CHAT_BIND_ADDR") {
            self.bind_addr = addr;
        }
        self.max_clients = read_env_or_default("CHAT_MAX_CLIENTS", self.max_clients)?;
        self.max_line_length = read_env_or_default("CHAT_MAX_LINE_LENGTH", self.max_line_length)?;
        if let Ok(path) = env::var("CHAT_LOG_PATH") {
            self.chat_log = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        Ok(self)
    }

    /// Reject limits that would make the server unusable
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::ZeroLimit("max_clients"));
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::ZeroLimit("max_line_length"));
        }
        Ok(self)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(value) => value.parse::<T>().map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
