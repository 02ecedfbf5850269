//! Ankpool runner: boots the platform core and its game automation.

use ankpool::{Platform, PlatformConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ankpool", about = "Numbers betting platform core")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PlatformConfig::load(path)?,
        None => PlatformConfig::default(),
    };

    let platform = Platform::new(config);
    // Make sure a payout configuration exists before the first settlement
    platform.commission.current_or_seed();

    let scheduler = platform.scheduler();
    let handles = scheduler.spawn();
    info!("ankpool platform core running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping game automation");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
