//! kvmirror CLI
//!
//! Command-line tools for inspecting kvmirror behavior.
//!
//! # Commands
//!
//! - `sort-keys` - Print keys in tree-store order
//! - `push-id` - Generate chronologically sortable push ids
//! - `simulate` - Replay collection states through a keyed synchronizer

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// kvmirror command-line tools.
#[derive(Parser)]
#[command(name = "kvmirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format shared by commands that print structured data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One item per line
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Backend a simulation runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Hierarchical realtime tree with ordered collections
    Tree,
    /// Document store emulated in memory
    Document,
}

#[derive(Subcommand)]
enum Commands {
    /// Print keys in tree-store order
    SortKeys {
        /// Keys to sort
        #[arg(required = true)]
        keys: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Generate push ids
    PushId {
        /// Number of ids to generate
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Replay collection states from a JSON file through a keyed synchronizer
    Simulate {
        /// JSON file holding an array of collection states
        file: PathBuf,

        /// Backend to write to
        #[arg(short, long, value_enum, default_value = "document")]
        backend: Backend,

        /// Collection name
        #[arg(short, long, default_value = "items")]
        collection: String,
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
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::SortKeys { keys, format } => {
            commands::sort_keys::run(keys, format)?;
        }
        Commands::PushId { count } => {
            commands::push_id::run(count);
        }
        Commands::Simulate {
            file,
            backend,
            collection,
        } => {
            commands::simulate::run(&file, backend, &collection)?;
        }
        Commands::Version => {
            println!("kvmirror CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
