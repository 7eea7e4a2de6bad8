//! Binary entry point for memorygraph.
//!
//! Exit codes: 0 clean shutdown, 1 initialization failure, 2 unrecoverable
//! backend loss during a server run.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// CLI diagnostics go to stderr.
#![allow(clippy::print_stderr)]

use clap::Parser;
use std::process::ExitCode;

use memorygraph::cli::{Cli, Command};
use memorygraph::commands;
use memorygraph::config::MemoryGraphConfig;
use memorygraph::observability::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = MemoryGraphConfig::from_env();

    let json_logs = matches!(cli.command, Command::Serve { json_logs: true });
    init_logging(&config, json_logs);

    match cli.command {
        Command::Serve { .. } => match commands::cmd_serve(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("server failed: {e}");
                ExitCode::from(2)
            },
        },
        Command::Export { output } => run(commands::cmd_export(&config, &output)),
        Command::Import { input, merge } => run(commands::cmd_import(&config, &input, merge)),
        Command::Migrate {
            source,
            target,
            dry_run,
            merge,
        } => run(commands::cmd_migrate(&config, &source, &target, dry_run, merge)),
        Command::Health => match commands::cmd_health(&config) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(2),
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            },
        },
        Command::Status => run(commands::cmd_status(&config)),
    }
}

/// Maps a one-shot command result to an exit code.
fn run(result: memorygraph::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    }
}
