//! LiteSync CLI
//!
//! Command-line tools for LiteSync store maintenance.
//!
//! # Commands
//!
//! - `init` - Create the schema
//! - `inspect` - Display row totals, or one client's item count
//! - `scan` - Dump entity rows or shadow tag rows

mod commands;

use clap::{Parser, Subcommand};
use commands::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LiteSync command-line store tools.
#[derive(Parser)]
#[command(name = "litesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(global = true, short, long, default_value = "./litesync.sqlite")]
    db: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sync_entities table and its client tag index
    Init,

    /// Display row totals for the store
    Inspect {
        /// Report the item count of one client instead
        #[arg(short, long)]
        client: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Dump stored rows
    Scan {
        /// Dump shadow tag rows instead of entities
        #[arg(short, long)]
        tags: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
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
        Commands::Init => {
            commands::init::run(&cli.db)?;
        }
        Commands::Inspect { client, format } => {
            commands::inspect::run(&cli.db, client.as_deref(), format)?;
        }
        Commands::Scan { tags, format } => {
            commands::scan::run(&cli.db, tags, format)?;
        }
        Commands::Version => {
            println!("LiteSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("LiteSync Store v{}", litesync_store::VERSION);
        }
    }

    Ok(())
}
