//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Persistent graph-structured memory for AI coding agents.
#[derive(Debug, Parser)]
#[command(name = "memorygraph", version, about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the MCP server over stdio.
    Serve {
        /// Emit logs as line-delimited JSON.
        #[arg(long)]
        json_logs: bool,
    },

    /// Export the active backend to a snapshot file.
    Export {
        /// Output path for the snapshot JSON.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a snapshot file into the active backend.
    Import {
        /// Snapshot JSON to import.
        #[arg(short, long)]
        input: PathBuf,

        /// Replace rows whose IDs already exist instead of refusing.
        #[arg(long)]
        merge: bool,
    },

    /// Migrate all data from one backend to another.
    Migrate {
        /// Source backend: sqlite or cloud.
        #[arg(long, env = "MEMORY_BACKEND", default_value = "sqlite")]
        source: String,

        /// Target backend: sqlite or cloud.
        #[arg(long)]
        target: String,

        /// Report what would transfer without writing.
        #[arg(long)]
        dry_run: bool,

        /// Replace rows whose IDs already exist instead of refusing.
        #[arg(long)]
        merge: bool,
    },

    /// Probe the active backend and report health.
    Health,

    /// Show backend statistics.
    Status,
}
