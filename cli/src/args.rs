use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command line arguments for the gateway binary.
#[derive(Debug, Parser)]
#[command(name = "gateway-cli", version, about = "LLM API gateway with a Prompt Firewall")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "gateway.toml")]
    pub config: PathBuf,

    /// Overrides `server.listen_address` from the configuration file.
    #[arg(short, long, env = "GATEWAY_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// `env_logger`-style log filter, e.g. `"info"` or `"gateway=debug,config=debug"`.
    #[arg(long, env = "GATEWAY_LOG", default_value = "info")]
    pub log_filter: String,
}
