use anyhow::Result;
use clap::Parser;

use surimon_daemon::cli::DaemonCli;
use surimon_daemon::logging::init_tracing;
use surimon_daemon::orchestrator::{Daemon, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config = load_config(&cli).await?;

    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "surimon starting");

    let mut daemon = Daemon::build_from_config(config)?;
    daemon.run().await
}
