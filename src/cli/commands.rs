//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: periodic automatic distribution until Ctrl-C
//! - once: a single manual session
//! - preview: show who would receive, in what order
//! - history: recent session summaries

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dripfeed - drip-feed distribution of a replenishable pool
#[derive(Parser, Debug)]
#[command(name = "dripfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session on every trigger interval until interrupted
    Run {
        /// Trigger the first session immediately instead of after one interval
        #[arg(short, long)]
        now: bool,
    },

    /// Run a single manual session and print its summary
    Once {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show eligible candidates in distribution order
    Preview,

    /// Show recent session summaries
    History {
        /// Number of sessions to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}
