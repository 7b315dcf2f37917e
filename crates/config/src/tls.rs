//! TLS termination configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// TLS certificate/key pair used to terminate HTTPS directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsServerConfig {
    /// Path to a PEM-encoded certificate chain.
    pub certificate: PathBuf,
    /// Path to a PEM-encoded private key.
    pub key: PathBuf,
}
