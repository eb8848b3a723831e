use std::path::PathBuf;

use clap::Parser;

/// Axon Responses gateway
#[derive(Debug, Parser)]
#[command(name = "axon", about = "Responses API gateway over chat-completion providers")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "axon.toml", env = "AXON_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "AXON_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
