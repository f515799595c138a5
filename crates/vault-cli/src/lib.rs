//! # vault-cli — Operator CLI for the Vault Stack
//!
//! Provides the `vault` command-line interface over a node's data
//! directory:
//!
//! - `vault keygen` — generate an Ed25519 seed file and print the public
//!   key and fingerprint.
//! - `vault anchor` — submit a `VaultAnchorWriteRequest.v1` body and
//!   print the sealed receipt.
//! - `vault tip` — print a stream's tip entry.
//! - `vault verify` — offline verification of streams, capsule chains,
//!   and receipts.
//!
//! All commands read and write JSON so they compose with shell pipelines.

pub mod anchor;
pub mod keygen;
pub mod tip;
pub mod verify;

use std::path::Path;
use std::sync::Arc;

use vault_crypto::{ContentStore, PublicKeyArchive};
use vault_ledger::AppendLog;

/// Open the three stores under a node data directory. Layout matches the
/// server: `log/`, `cas/`, `keys/`.
pub fn open_node(data_dir: &Path) -> (Arc<AppendLog>, Arc<ContentStore>, PublicKeyArchive) {
    (
        Arc::new(AppendLog::new(data_dir.join("log"))),
        Arc::new(ContentStore::new(data_dir.join("cas"))),
        PublicKeyArchive::new(data_dir.join("keys")),
    )
}
