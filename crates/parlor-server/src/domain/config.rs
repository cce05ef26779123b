//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It can be constructed from CLI arguments, loaded from a TOML file (see
//! `infrastructure::storage`), or built from defaults for local development
//! and tests. Keeping it a plain struct — no global state, no environment
//! reads inside the domain — makes the server easy to embed in tests.

use std::net::SocketAddr;
use std::time::Duration;

/// All runtime configuration for the collaboration server.
///
/// Build this once at startup and hand clones to the components that need
/// it.
///
/// # Example
///
/// ```rust
/// use parlor_server::domain::ServerConfig;
///
/// // Defaults are suitable for local development:
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8686);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port the WebSocket listener binds to.
    ///
    /// `0.0.0.0` accepts connections from any interface; set `127.0.0.1`
    /// to accept only local connections.
    pub bind_addr: SocketAddr,

    /// How long a content-retrieval request may stay pending before it is
    /// abandoned and fails with a timeout.
    ///
    /// A client that never answers a `project-request` would otherwise
    /// leak its pending continuation for the lifetime of the session.
    pub project_request_timeout: Duration,
}

impl Default for ServerConfig {
    /// Returns a `ServerConfig` suitable for local development without any
    /// external configuration.
    ///
    /// | Field                   | Default         |
    /// |-------------------------|-----------------|
    /// | bind_addr               | `0.0.0.0:8686`  |
    /// | project_request_timeout | 30 seconds      |
    fn default() -> Self {
        Self {
            // Safe: a compile-time-known valid socket address string.
            bind_addr: "0.0.0.0:8686".parse().unwrap(),
            project_request_timeout: Duration::from_secs(30),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
