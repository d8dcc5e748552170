//! Taleweaver CLI - turn a picture into a short story and an audio reading.
//!
//! The image is captioned with BLIP, the caption seeds a ~100 word story from
//! a hosted chat model, and the story is read aloud by a hosted TTS model.
//!
//! # Usage
//!
//! ```bash
//! # Start the web UI on http://127.0.0.1:8501
//! taleweaver serve
//!
//! # One-shot from the terminal
//! taleweaver tell dog.jpg --temperature 0.9
//!
//! # Fetch the local captioning model
//! taleweaver models download
//!
//! # Store an API token
//! taleweaver config set story.api_key <token>
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;
mod server;

/// Taleweaver - turn a picture into a short story and an audio reading.
#[derive(Parser, Debug)]
#[command(name = "taleweaver")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TALEWEAVER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the web UI
    Serve(server::ServeArgs),

    /// Caption an image, write a story about it and read it aloud
    Tell(cli::tell::TellArgs),

    /// Manage the local captioning model (download, list, etc.)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(taleweaver_core::Config::default_path);

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match taleweaver_core::Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config from {}: {e}\n  \
                 Using default configuration. Check it with `taleweaver config show`.",
                config_path.display()
            );
            taleweaver_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Taleweaver v{}", taleweaver_core::VERSION);

    match cli.command {
        Commands::Serve(args) => server::execute(args, config).await,
        Commands::Tell(args) => cli::tell::execute(args, config).await,
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config, &config_path),
    }
}
