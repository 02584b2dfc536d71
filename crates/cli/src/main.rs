//! Parlance CLI: the main entry point.
//!
//! Commands:
//! - `chat`    Interactive ordering session with persisted history
//! - `ask`     Send a single message and print the reply
//! - `config`  Print the default or the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "parlance",
    about = "Parlance: a restaurant ordering assistant driven by a chat model",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Read configuration from this file instead of ~/.parlance/config.toml
    #[arg(short, long, global = true, env = "PARLANCE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively; type `exit` to leave
    Chat {
        /// Where to persist the conversation (overrides `history_file`)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Start from an empty conversation instead of the saved one
        #[arg(long)]
        fresh: bool,
    },

    /// Send a single message
    Ask {
        #[arg(short, long)]
        message: String,
    },

    /// Show configuration
    Config {
        /// Print the loaded configuration instead of the defaults
        #[arg(long)]
        effective: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat { history, fresh } => commands::chat::run(config, history, fresh).await?,
        Commands::Ask { message } => commands::ask::run(config, message).await?,
        Commands::Config { effective } => commands::config_cmd::run(&config, effective),
    }

    Ok(())
}
