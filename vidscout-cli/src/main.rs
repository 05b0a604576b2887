//! Vidscout CLI - Command-line interface
//!
//! Runs the resolution API server and exposes one-shot resolution and
//! registry inspection for operators.

mod commands;

use clap::Parser;
use vidscout_core::tracing_setup::{LogVerbosity, init_tracing};

#[derive(Parser)]
#[command(name = "vidscout")]
#[command(about = "Finds a working embed source for a title across mirror providers")]
struct Cli {
    /// Console verbosity: quiet, normal, probes or trace
    #[arg(long, value_enum, global = true, default_value_t = LogVerbosity::Normal)]
    log_level: LogVerbosity,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level, None)?;

    commands::handle_command(cli.command).await
}
