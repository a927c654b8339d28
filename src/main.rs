//! Stepwise - Main Server
//!
//! Project tracker backend: HTTP API, document triggers and push delivery.

use anyhow::Result;
use clap::{Parser, Subcommand};
use stepwise::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "Step-by-step project tracker backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server with triggers and scheduled cleanup
    Serve {
        /// Port to listen on (overrides config.yaml / SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep all data in memory instead of Neo4j
        #[arg(long)]
        memory: bool,
    },

    /// Delete stale push tokens once and exit
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,stepwise=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port, memory } => {
            if let Some(port) = port {
                config.server_port = port;
            }
            stepwise::start_server(config, memory).await
        }
        Commands::Sweep => {
            let report = stepwise::run_sweep(config).await?;
            tracing::info!(
                "Sweep complete: {} of {} tokens stale, {} deleted in {} batches",
                report.stale,
                report.total,
                report.deleted,
                report.batches
            );
            Ok(())
        }
    }
}
