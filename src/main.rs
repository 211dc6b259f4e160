//! CGPA calculator backend.
//!
//! Students register with their register number and a PIN, then save and
//! load their calculator state as an opaque JSON document.

mod auth;
mod config;
mod data;
mod error;
mod gateway;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cgpa-backend", version, about = "CGPA calculator backend")]
struct Cli {
    /// Address to bind the HTTP gateway to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load();

    gateway::run_gateway(&cli.host, cli.port, &config).await
}
