//! Parlor collaboration server — entry point.
//!
//! Accepts WebSocket connections from editors and hosts the shared tables
//! they collaborate at. Each connection gets its own session with a
//! server-assigned identity announced in a `uuid` handshake frame.
//!
//! # Usage
//!
//! ```text
//! parlor-server [OPTIONS]
//!
//! Options:
//!   --bind <IP>              Listener bind address [default: 0.0.0.0]
//!   --port <PORT>            Listener port [default: 8686]
//!   --config <PATH>          Optional TOML configuration file
//!   --request-timeout <SECS> Content-retrieval timeout [default: 30]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence, then the config file, then defaults.
//!
//! | Variable                 | Description                        |
//! |--------------------------|------------------------------------|
//! | `PARLOR_BIND`            | Listener bind address              |
//! | `PARLOR_PORT`            | Listener port                      |
//! | `PARLOR_CONFIG`          | Path to the TOML config file       |
//! | `PARLOR_REQUEST_TIMEOUT` | Content-retrieval timeout (secs)   |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parlor_server::application::Directory;
use parlor_server::domain::ServerConfig;
use parlor_server::infrastructure::{load_config, run_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Parlor collaboration server.
///
/// Hosts shared editing tables over WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "parlor-server",
    about = "Real-time collaboration server with shared tables and seats",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket listener to.
    ///
    /// Use `0.0.0.0` to accept connections from any interface, or
    /// `127.0.0.1` for local connections only.
    #[arg(long, env = "PARLOR_BIND")]
    bind: Option<String>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "PARLOR_PORT")]
    port: Option<u16>,

    /// Path to a TOML configuration file.
    ///
    /// CLI arguments override values from the file.
    #[arg(long, env = "PARLOR_CONFIG")]
    config: Option<PathBuf>,

    /// Content-retrieval timeout in seconds.
    ///
    /// A `project-request` with no matching response fails after this many
    /// seconds instead of staying pending forever.
    #[arg(long, env = "PARLOR_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,
}

impl Cli {
    /// Resolves the effective [`ServerConfig`]: config file (when given)
    /// as the base, individual CLI flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error when the config file cannot be loaded or the
    /// bind/port pair does not form a valid socket address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if self.bind.is_some() || self.port.is_some() {
            let bind = self
                .bind
                .unwrap_or_else(|| config.bind_addr.ip().to_string());
            let port = self.port.unwrap_or_else(|| config.bind_addr.port());
            config.bind_addr = format!("{bind}:{port}")
                .parse::<SocketAddr>()
                .with_context(|| format!("invalid bind address: '{bind}:{port}'"))?;
        }
        if let Some(secs) = self.request_timeout {
            config.project_request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level comes from RUST_LOG, falling back to `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_server_config()?;

    info!(
        "parlor server starting — bind={}, request_timeout={:?}",
        config.bind_addr, config.project_request_timeout
    );

    let directory = Arc::new(Directory::new());

    // Graceful shutdown: Ctrl+C clears the flag, and the accept loop in
    // `run_server` checks it every 200 ms.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, directory, running).await?;

    info!("parlor server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_resolve_to_default_config() {
        let cli = Cli::parse_from(["parlor-server"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.bind_addr.port(), 8686);
        assert_eq!(config.bind_addr.ip().to_string(), "0.0.0.0");
        assert_eq!(config.project_request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["parlor-server", "--port", "9000"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        // The bind address keeps its default when only the port changes.
        assert_eq!(config.bind_addr.ip().to_string(), "0.0.0.0");
    }

    #[test]
    fn test_cli_bind_override() {
        let cli = Cli::parse_from(["parlor-server", "--bind", "127.0.0.1"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8686");
    }

    #[test]
    fn test_cli_request_timeout_override() {
        let cli = Cli::parse_from(["parlor-server", "--request-timeout", "5"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.project_request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_cli_invalid_bind_returns_error() {
        let cli = Cli {
            bind: Some("not.an.ip".to_string()),
            port: None,
            config: None,
            request_timeout: None,
        };
        assert!(cli.into_server_config().is_err());
    }

    #[test]
    fn test_cli_missing_config_file_returns_error() {
        let cli = Cli {
            bind: None,
            port: None,
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            request_timeout: None,
        };
        assert!(cli.into_server_config().is_err());
    }
}
