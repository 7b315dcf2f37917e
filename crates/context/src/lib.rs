//! Per-request identity shared across the gateway's dialect and firewall layers.

mod authentication;
mod client_identity;

pub use authentication::Authentication;
pub use client_identity::ClientIdentity;
