use clap::{Parser, Subcommand};
use event_indexer::cli::run::RunOptions;
use event_indexer::config::resolve_config_path;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "event-indexer")]
#[command(about = "Batched indexing of device events into Solr", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index newline-delimited JSON events
    Run {
        /// Read events from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// Keep documents in memory instead of sending them to the index
        #[arg(long)]
        dry_run: bool,
    },
    /// Check that the configured index is reachable
    Ping,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "event_indexer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { input, dry_run }) => {
            event_indexer::cli::run::run(config_path, RunOptions { input, dry_run }).await?;
        }
        // Default behavior is to run from stdin
        None => {
            event_indexer::cli::run::run(config_path, RunOptions::default()).await?;
        }
        Some(Commands::Ping) => {
            event_indexer::cli::ping::ping(config_path).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                event_indexer::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
