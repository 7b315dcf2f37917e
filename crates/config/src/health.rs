//! Liveness endpoint configuration.

use std::net::SocketAddr;

use serde::Deserialize;

/// Health check endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    /// Whether the health endpoint is exposed at all.
    pub enabled: bool,
    /// Bind the health endpoint on its own listener instead of the main one.
    pub listen: Option<SocketAddr>,
    /// Path of the health endpoint on the main listener.
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: None,
            path: "/health".to_string(),
        }
    }
}
