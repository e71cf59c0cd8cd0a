//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gator - a personal RSS feed aggregator.
#[derive(Parser, Debug)]
#[command(name = "gator", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Poll feeds forever, one feed per interval (e.g. `30s`, `2m`, `1m30s`).
    Agg {
        /// Time between requests.
        interval: String,
    },
}
