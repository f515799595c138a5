//! # vault CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vault_cli::anchor::{run_anchor, AnchorArgs};
use vault_cli::keygen::{run_keygen, KeygenArgs};
use vault_cli::tip::{run_tip, TipArgs};
use vault_cli::verify::{run_verify, VerifyArgs};

/// Vault Stack CLI
///
/// Deterministic content-addressed ledger with cryptographic anchoring:
/// key provisioning, anchor writes, stream inspection, and offline
/// verification.
#[derive(Parser, Debug)]
#[command(name = "vault", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 seed file and print the public identity.
    Keygen(KeygenArgs),

    /// Submit a VaultAnchorWriteRequest.v1 and print the sealed receipt.
    Anchor(AnchorArgs),

    /// Print a stream's tip entry.
    Tip(TipArgs),

    /// Offline verification of streams, capsule chains, and receipts.
    Verify(VerifyArgs),
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
        .init();

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Anchor(args) => run_anchor(&args),
        Commands::Tip(args) => run_tip(&args),
        Commands::Verify(args) => run_verify(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
