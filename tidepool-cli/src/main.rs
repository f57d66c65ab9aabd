//! Tidepool CLI - Command-line interface
//!
//! Runs fragment window selections and session validation against local
//! JSON fragment listings, for inspection and offline debugging.

mod commands;

use clap::Parser;
use tidepool_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "tidepool")]
#[command(about = "Fragment windowing toolkit for archived media streams")]
struct Cli {
    /// Console log level
    #[arg(long, default_value = "warn")]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(error) = init_tracing(cli.log_level.as_tracing_level(), None) {
        eprintln!("Warning: tracing setup failed: {error}");
    }

    commands::handle_command(cli.command).await
}
