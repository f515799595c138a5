//! # `vault verify`

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};

use vault_anchor::AnchorReceipt;
use vault_core::StreamId;
use vault_crypto::Ed25519PublicKey;
use vault_verify::{verify_capsule_chain, verify_receipt, verify_stream};

use crate::open_node;

/// Arguments for offline verification.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(subcommand)]
    pub command: VerifyCommand,
}

/// What to verify.
#[derive(Subcommand, Debug)]
pub enum VerifyCommand {
    /// Walk a stream and recompute every commitment.
    Stream {
        /// Node data directory.
        #[arg(long)]
        data_dir: PathBuf,
        /// Stream to verify.
        stream: String,
    },
    /// Verify a capsule chain, including parent-CID linkage.
    Capsules {
        /// Node data directory.
        #[arg(long)]
        data_dir: PathBuf,
        /// Stream to verify.
        stream: String,
    },
    /// Verify a sealed receipt.
    Receipt {
        /// Receipt JSON file.
        #[arg(long)]
        receipt: PathBuf,
        /// Hex public key; if absent, looked up in the node's archive.
        #[arg(long)]
        public_key: Option<String>,
        /// Node data directory holding the public-key archive.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// Run a verification and print the report. Returns an error (nonzero
/// exit) when the verified object is broken.
pub fn run_verify(args: &VerifyArgs) -> anyhow::Result<()> {
    match &args.command {
        VerifyCommand::Stream { data_dir, stream } => {
            let stream = StreamId::new(stream)?;
            let (log, store, _) = open_node(data_dir);
            let report = verify_stream(&log, &store, &stream)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_intact() {
                bail!("stream {stream} is BROKEN ({} defects)", report.defect_count());
            }
            Ok(())
        }
        VerifyCommand::Capsules { data_dir, stream } => {
            let stream = StreamId::new(stream)?;
            let (log, store, _) = open_node(data_dir);
            let report = verify_capsule_chain(&log, &store, &stream, None)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_intact() {
                bail!(
                    "capsule chain {stream} is BROKEN ({} defects)",
                    report.defect_count()
                );
            }
            Ok(())
        }
        VerifyCommand::Receipt {
            receipt,
            public_key,
            data_dir,
        } => {
            let text = std::fs::read_to_string(receipt)
                .with_context(|| format!("reading receipt {}", receipt.display()))?;
            let receipt: AnchorReceipt =
                serde_json::from_str(&text).context("receipt is not valid JSON")?;

            let key = match (public_key, data_dir) {
                (Some(hex), _) => Ed25519PublicKey::from_hex(hex)?,
                (None, Some(dir)) => {
                    let (_, _, archive) = open_node(dir);
                    archive
                        .lookup(&receipt.vault_fingerprint)?
                        .with_context(|| {
                            format!(
                                "fingerprint {} not in the archive",
                                receipt.vault_fingerprint
                            )
                        })?
                }
                (None, None) => bail!("pass --public-key or --data-dir"),
            };

            match verify_receipt(&receipt, &key) {
                Ok(()) => {
                    println!("{}", serde_json::json!({"verdict": "ok"}));
                    Ok(())
                }
                Err(defect) => {
                    println!(
                        "{}",
                        serde_json::json!({"verdict": "broken", "reason": defect.to_string()})
                    );
                    bail!("receipt verification failed: {defect}");
                }
            }
        }
    }
}
