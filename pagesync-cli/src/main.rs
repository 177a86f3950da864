//! pagesync: publish generated content to a git branch.
//!
//! # Usage
//!
//! ```text
//! pagesync init [--dir <dir>] [--repo-uri <uri>] [--branch <branch>] [--force]
//! pagesync publish [--config <file>] [--branch <b>] [--repo-uri <u>] [--repo-dir <d>] [--message <m>]
//! pagesync status [--config <file>] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, publish::PublishArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pagesync",
    version,
    about = "Publish generated content to a git branch",
    long_about = None,
)]
struct Cli {
    /// Log debug detail to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter pagesync.yaml.
    Init(InitArgs),

    /// Reset the mirror, copy content, commit and push.
    Publish(PublishArgs),

    /// Inspect the local mirror without touching the network.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Publish(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
