//! # vault-anchor — The Write-Anchor Protocol
//!
//! Implements the `VaultAnchorWrite.v1` contract: a caller who has already
//! hashed its payload submits the hash plus metadata, and the vault
//! returns a sealed, signed [`AnchorReceipt`]: the sole evidence the
//! caller needs to prove fossilization. The vault stores metadata only,
//! never payload bytes.
//!
//! ## Sealing
//!
//! 1. The pre-anchor receipt (anchor_hash empty, signature absent) is
//!    canonicalized and signed with the vault key.
//! 2. The signature is inserted and the receipt (still with anchor_hash
//!    empty) is canonicalized and hashed; the digest becomes
//!    `anchor_hash`.
//!
//! Callers verify both: the signature over the pre-anchor bytes and the
//! recomputed anchor hash.
//!
//! ## Streams and rotation
//!
//! Each anchor stream is bound to the signing key's fingerprint. Rotating
//! the key tears down the old signer and opens a new stream; receipts from
//! the old stream remain verifiable through the public-key archive.

pub mod error;
pub mod receipt;
pub mod service;

pub use error::AnchorError;
pub use receipt::{
    compute_anchor_hash, pre_anchor_bytes, AnchorLedgerLine, AnchorReceipt, AnchorRequest,
    LEDGER_LINE_SCHEMA_VERSION, RECEIPT_SCHEMA_VERSION, REQUEST_SCHEMA_VERSION,
};
pub use service::AnchorService;
