//! # agentid CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agentid_cli::authorize::{run_authorize, AuthorizeArgs};
use agentid_cli::issue::{run_issue, IssueArgs};
use agentid_cli::keygen::{run_keygen, KeygenArgs};
use agentid_cli::verify::{run_verify, VerifyArgs};

/// Agent identity broker toolchain.
///
/// Generates signing keys, issues and verifies delegation credentials, and
/// dry-runs authorization decisions against the broker's configuration.
#[derive(Parser, Debug)]
#[command(name = "agentid", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate HMAC or Ed25519 signing material.
    Keygen(KeygenArgs),

    /// Issue a signed credential with the configured broker key.
    Issue(IssueArgs),

    /// Check a credential's signature, issuer, and expiry.
    Verify(VerifyArgs),

    /// Run an execute request through the authorization pipeline.
    Authorize(AuthorizeArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();
    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args, &mut stdout),
        Commands::Issue(args) => run_issue(args, &mut stdout),
        Commands::Verify(args) => run_verify(args, &mut stdout),
        Commands::Authorize(args) => run_authorize(args, &mut stdout),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
