//! Konishi CLI — gate releases on GPG signature trust.
//!
//! Collects a configurable set of commits and tags from a git repository
//! and verifies that every one of them carries a signature meeting the
//! trust policy. Meant to run in CI as a release/merge gate.

mod commands;
mod inputs;

use clap::Parser;
use color_eyre::eyre::Result;

/// Konishi — trust-policy verification of signed git history.
#[derive(Parser)]
#[command(name = "konishi", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (repeat for more detail: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output logs as JSON (for machine consumption).
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Collect commits and tags, verify their signatures, and report.
    Check(commands::check::CheckArgs),
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Check(args) => commands::check::execute(args),
    }
}
