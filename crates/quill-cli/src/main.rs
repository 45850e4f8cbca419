use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;

use commands::replay::ReplayOptions;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill CLI - replay generation streams into a document", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL event trace against an in-memory document
    Replay {
        /// Trace file, one stream event per line
        trace: PathBuf,
        /// Prompt stored on the request node
        #[arg(long, default_value = "Generate content")]
        prompt: String,
        /// Subject the request node belongs to
        #[arg(long, default_value = "replay")]
        subject: String,
        /// Send events with the correlation ids recorded in the trace
        #[arg(long)]
        keep_ids: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (service, paths) = commands::utils::config_service(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay {
            trace,
            prompt,
            subject,
            keep_ids,
            json,
        } => {
            let config = service
                .get_config()
                .context("Failed to load configuration")?;
            let trace_events = commands::utils::init_logging(&config)?;
            let options = ReplayOptions {
                trace: commands::utils::resolve_trace_path(&trace, &paths),
                prompt,
                subject,
                keep_ids,
                json,
            };
            commands::replay::run(&config, options, trace_events).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&service)?,
            ConfigAction::Path => commands::config::path(&service),
            ConfigAction::Init { force } => commands::config::init(&service, force)?,
        },
    }

    Ok(())
}
