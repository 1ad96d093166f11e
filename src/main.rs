use anyhow::Result;
use clap::Parser;
use tracing::info;

use rover_signal::config::{Cli, Command};
use rover_signal::{peer, util, RelayConfig, RelayServer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_log();

    match cli.command {
        Command::Server(args) => {
            let server = RelayServer::bind(RelayConfig::from(args)).await?;
            server.run_until(util::ctrl_c()).await?;
            info!("Relay stopped");
        }
        Command::Peer(args) => peer::run(args).await?,
    }

    Ok(())
}
