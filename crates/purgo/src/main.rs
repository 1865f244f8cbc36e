//! Purgo CLI - Strip identifying metadata from images without re-encoding them.
//!
//! Purgo removes EXIF (including GPS), XMP, IPTC, comments, text chunks and
//! timestamps from JPEG, PNG and WebP files. Pixel data is copied verbatim.
//!
//! # Usage
//!
//! ```bash
//! # Strip a few files into ./clean
//! purgo strip IMG_0001.jpg scan.png --output ./clean
//!
//! # Strip a whole directory, reporting as JSON
//! purgo strip ./photos --output ./clean --json
//!
//! # See what a file is carrying
//! purgo inspect IMG_0001.jpg
//!
//! # View configuration
//! purgo config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Purgo - Strip identifying metadata from images without touching a pixel.
#[derive(Parser, Debug)]
#[command(name = "purgo")]
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
    /// Strip metadata from files and write the clean copies to a directory
    Strip(cli::strip::StripArgs),

    /// List the metadata a file carries without modifying it
    Inspect(cli::inspect::InspectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go straight to stderr.
    let config = match purgo_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `purgo config path`."
            );
            purgo_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Purgo v{}", purgo_core::VERSION);

    match cli.command {
        Commands::Strip(args) => cli::strip::execute(args, config).await,
        Commands::Inspect(args) => cli::inspect::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
