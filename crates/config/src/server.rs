//! HTTP server bind/TLS/health/CORS configuration.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::{HealthConfig, TlsServerConfig};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// TLS configuration for secure connections.
    pub tls: Option<TlsServerConfig>,
    /// Health endpoint configuration.
    pub health: HealthConfig,
    /// Whether to attach a permissive (`Any`/`Any`/`Any`) CORS layer.
    ///
    /// This gateway has no browser-facing session state, so a full allow-list CORS
    /// configuration surface is not part of the core contract; permissive CORS is enough
    /// for server-to-server and same-origin browser clients alike.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            tls: None,
            health: HealthConfig::default(),
            cors_permissive: true,
        }
    }
}
