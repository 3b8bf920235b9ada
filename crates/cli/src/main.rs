//! PersonaChat CLI - the main entry point.
//!
//! Commands:
//! - `chat`    - Interactive chat, keeping history for the session
//! - `ask`     - Ask a single question
//! - `serve`   - Start the HTTP gateway
//! - `doctor`  - Diagnose config, profile and credentials

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "personachat",
    about = "PersonaChat — answers as you, checked by a second model",
    version,
    author
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

    /// Config file (defaults to ~/.personachat/config.toml)
    #[arg(long, global = true, env = "PERSONACHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the persona interactively
    Chat,

    /// Ask a single question and print the answer
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        /// Print the full outcome (path, model calls) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Diagnose configuration, profile files and API keys
    Doctor {
        /// Also contact each model's provider
        #[arg(long)]
        online: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat => commands::chat::run(config_path).await?,
        Commands::Ask { message, json } => commands::ask::run(config_path, message, json).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Doctor { online } => commands::doctor::run(config_path, online).await?,
    }

    Ok(())
}
