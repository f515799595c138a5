//! # Hash Chain Links
//!
//! Stateless helpers shared by the append log and the replay verifier.
//! The link hash commits to exactly four fields in canonical form:
//!
//! ```text
//! hash = SHA256(JCS({"payload_cid": ..., "prev_hash": ..., "record_digest": ..., "seq": ...}))
//! ```
//!
//! `prev_hash` is `null` at genesis. Wall-clock fields never participate.
//! The log's serialization decides `seq`; these helpers never invent order.

use thiserror::Error;

use vault_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, PayloadCid};

use crate::entry::ChainEntry;

/// A defect found when checking two adjacent entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainDefect {
    /// `next.seq` is not `prev.seq + 1`.
    #[error("sequence gap: expected {expected}, got {actual}")]
    SeqGap {
        /// The expected next sequence number.
        expected: u64,
        /// The sequence number found.
        actual: u64,
    },

    /// `next.prev_hash` does not equal `prev.hash`.
    #[error("broken link at seq {seq}: prev_hash {actual} != predecessor hash {expected}")]
    PrevHashMismatch {
        /// The sequence number of the defective entry.
        seq: u64,
        /// The predecessor's actual hash.
        expected: String,
        /// The `prev_hash` the entry carries.
        actual: String,
    },

    /// A genesis entry (`seq == 0`) carries a non-null `prev_hash`.
    #[error("genesis entry carries a prev_hash")]
    GenesisWithPrevHash,
}

/// Compute the chain hash for an entry's position.
pub fn link(
    prev_hash: Option<&ContentDigest>,
    record_digest: &ContentDigest,
    payload_cid: &PayloadCid,
    seq: u64,
) -> Result<ContentDigest, CanonicalizationError> {
    let value = serde_json::json!({
        "prev_hash": prev_hash.map(|d| d.to_hex()),
        "record_digest": record_digest.to_hex(),
        "payload_cid": payload_cid.to_string(),
        "seq": seq,
    });
    let canonical = CanonicalBytes::from_value(value)?;
    Ok(sha256_digest(&canonical))
}

/// Check the adjacency invariants between two consecutive entries.
pub fn verify_pair(prev: &ChainEntry, next: &ChainEntry) -> Result<(), ChainDefect> {
    if next.seq != prev.seq + 1 {
        return Err(ChainDefect::SeqGap {
            expected: prev.seq + 1,
            actual: next.seq,
        });
    }
    match &next.prev_hash {
        Some(h) if *h == prev.hash => Ok(()),
        Some(h) => Err(ChainDefect::PrevHashMismatch {
            seq: next.seq,
            expected: prev.hash.to_hex(),
            actual: h.to_hex(),
        }),
        None => Err(ChainDefect::PrevHashMismatch {
            seq: next.seq,
            expected: prev.hash.to_hex(),
            actual: "null".to_string(),
        }),
    }
}
