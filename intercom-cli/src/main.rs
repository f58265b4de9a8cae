use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use intercom::server::RelayConfig;

mod feedback;
mod panel;

#[derive(Parser)]
#[command(name = "intercom", version, about = "Room-to-room video intercom")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, env = "INTERCOM_LISTEN", default_value = "0.0.0.0:5000")]
        listen: SocketAddr,

        /// Drop calls to empty rooms without telling the caller.
        #[arg(long)]
        silent_unreachable: bool,
    },

    /// Run an intercom panel for one room.
    Room {
        room: String,

        #[arg(long, env = "INTERCOM_RELAY_URL", default_value = "ws://127.0.0.1:5000/ws")]
        relay: String,

        /// Seconds an unanswered call rings; 0 rings until someone acts.
        #[arg(long, default_value_t = 30)]
        ring_timeout: u64,

        /// STUN server used for ICE instead of the public default.
        #[arg(long)]
        stun: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve {
            listen,
            silent_unreachable,
        } => {
            println!("{}", "Starting intercom relay...".green().bold());
            let config = RelayConfig {
                listen_addr: listen,
                notify_unreachable: !silent_unreachable,
            };
            intercom::server::serve(config, shutdown_signal()).await?;
        }
        Commands::Room {
            room,
            relay,
            ring_timeout,
            stun,
        } => {
            let options = panel::PanelOptions {
                room: room.into(),
                relay_url: relay,
                ring_timeout: (ring_timeout > 0)
                    .then(|| std::time::Duration::from_secs(ring_timeout)),
                stun,
            };
            panel::run(options).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
}
