//! Command-line interface for crossword_duel.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Crossword Duel - two-player competitive crossword server
#[derive(Parser, Debug)]
#[command(name = "crossword_duel")]
#[command(about = "Two-player crossword server with a line-based protocol", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "crossword.toml", global = true)]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the TCP game server
    Serve {
        /// Directory of puzzle files (overrides the config file)
        #[arg(long)]
        puzzle_dir: Option<PathBuf>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,
    },

    /// Parse and validate puzzle files without serving them
    Check {
        /// Puzzle files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}
