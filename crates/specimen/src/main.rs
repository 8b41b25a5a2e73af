//! Specimen CLI - normalizes photos of print samples for the sample library.
//!
//! Every photo comes out as a square white JPEG with the sample centered and a
//! uniform margin. Photos on a non-white backdrop get their background removed
//! first when a remove.bg API key is configured.
//!
//! # Usage
//!
//! ```bash
//! # Normalize a single photo into ./normalized
//! specimen process sample.png
//!
//! # Reprocess a whole directory, recording results
//! specimen process ./uploads/ -o ./library --report report.jsonl
//!
//! # Check whether a photo would need background removal
//! specimen assess sample.png
//!
//! # View configuration
//! specimen config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Specimen - image normalization for print-sample photos.
#[derive(Parser, Debug)]
#[command(name = "specimen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize one image or a directory of images
    Process(cli::process::ProcessArgs),

    /// Report whether an image already sits on a white background
    Assess(cli::assess::AssessArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match specimen_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `specimen config path`."
            );
            specimen_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Specimen v{}", specimen_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args).await,
        Commands::Assess(args) => cli::assess::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
