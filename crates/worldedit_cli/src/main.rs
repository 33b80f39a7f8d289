//! WorldEdit CLI
//!
//! Command-line tools for the world editor's undo/redo history and its
//! remote synchronization.
//!
//! # Commands
//!
//! - `replay` - Run an edit script against an in-process server
//! - `validate` - Check a PATCH body, optionally against a world
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// World editor history and sync tools.
#[derive(Parser)]
#[command(name = "worldedit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an edit script through a synced editor session
    Replay {
        /// Script file (JSON)
        script: PathBuf,

        /// Flush once more than this many deltas are owed
        #[arg(short = 'n', long, default_value = "10")]
        max_changes: usize,

        /// Flush once more than this many seconds passed since the last upload
        #[arg(short = 's', long, default_value = "5")]
        max_seconds: f64,

        /// Skip the flush at the end of the script
        #[arg(long)]
        no_final_flush: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate a PATCH body
    Validate {
        /// Body file (JSON)
        body: PathBuf,

        /// World snapshot to apply the deltas to
        #[arg(short, long)]
        world: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            script,
            max_changes,
            max_seconds,
            no_final_flush,
            format,
        } => {
            let options = commands::replay::ReplayOptions {
                max_changes,
                max_seconds,
                final_flush: !no_final_flush,
            };
            commands::replay::run(&script, &options, &format)?;
        }
        Commands::Validate {
            body,
            world,
            format,
        } => {
            commands::validate::run(&body, world.as_deref(), &format)?;
        }
        Commands::Version => {
            println!("WorldEdit CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
