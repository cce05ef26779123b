//! TOML-based configuration file loading.
//!
//! The server runs fine with no file at all — every field has a default —
//! but deployments that want a pinned configuration can point `--config`
//! at a TOML file:
//!
//! ```toml
//! bind = "127.0.0.1"
//! port = 8686
//! request_timeout_secs = 30
//! ```
//!
//! Fields absent from the file fall back to their defaults, so a file from
//! an older deployment keeps working after new settings are introduced.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::ServerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The bind address assembled from the file is not valid.
    #[error("invalid bind address '{0}'")]
    InvalidBind(String),
}

/// The on-disk configuration schema.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ConfigFile {
    /// IP address to bind the WebSocket listener to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// TCP port for the WebSocket listener.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Content-retrieval timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8686
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ConfigFile {
    /// Converts the file schema into a runtime [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] when the bind/port pair does
    /// not form a valid socket address.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidBind(format!("{}:{}", self.bind, self.port)))?;
        Ok(ServerConfig {
            bind_addr,
            project_request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

/// Loads a [`ServerConfig`] from the TOML file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or
/// converted.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&text)?;
    file.into_server_config()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
