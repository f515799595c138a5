//! # Verification Reports
//!
//! Structured verdicts: one [`EntryReport`] per walked entry, each
//! carrying zero or more defects, rolled up into a [`StreamReport`].

use serde::Serialize;
use thiserror::Error;

use vault_core::StreamId;

/// A defect found at a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntryVerdict {
    /// The frame failed its checksum or could not be decoded.
    CorruptEntry {
        /// What failed.
        reason: String,
    },
    /// The recomputed link hash does not match the stored `hash`.
    HashMismatch {
        /// The recomputed hash.
        expected: String,
        /// The hash the entry carries.
        actual: String,
    },
    /// The stored record does not hash to `record_digest`.
    RecordDigestMismatch {
        /// The recomputed record digest.
        expected: String,
        /// The digest the entry carries.
        actual: String,
    },
    /// Chain adjacency is broken (`prev_hash`/`seq` against predecessor).
    BrokenChain {
        /// Diagnostic.
        reason: String,
    },
    /// `payload_cid` does not resolve in the content store.
    MissingPayload {
        /// The unresolvable CID.
        cid: String,
    },
    /// The stored payload does not rehash to the entry's digests.
    PayloadMismatch {
        /// Diagnostic.
        reason: String,
    },
    /// Capsule-specific defect (decode, parent linkage, tick order,
    /// state digest, replay divergence).
    CapsuleDefect {
        /// Diagnostic.
        reason: String,
    },
}

/// All defects found at one sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// The entry's sequence number.
    pub seq: u64,
    /// Defects at this entry; empty means the entry verified clean.
    pub defects: Vec<EntryVerdict>,
}

impl EntryReport {
    /// Whether this entry verified clean.
    pub fn is_ok(&self) -> bool {
        self.defects.is_empty()
    }
}

/// Overall stream verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamStatus {
    /// Every entry verified clean.
    Intact,
    /// At least one defect was found.
    Broken,
}

/// The outcome of walking a stream from genesis to tip.
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    /// The verified stream.
    pub stream: StreamId,
    /// Per-entry verdicts, in sequence order.
    pub entries: Vec<EntryReport>,
    /// Rolled-up status.
    pub status: StreamStatus,
}

impl StreamReport {
    /// Build a report, deriving the status from the entries.
    pub fn new(stream: StreamId, entries: Vec<EntryReport>) -> Self {
        let status = if entries.iter().all(EntryReport::is_ok) {
            StreamStatus::Intact
        } else {
            StreamStatus::Broken
        };
        Self {
            stream,
            entries,
            status,
        }
    }

    /// Whether the stream verified clean end to end.
    pub fn is_intact(&self) -> bool {
        self.status == StreamStatus::Intact
    }

    /// Total number of defects across all entries.
    pub fn defect_count(&self) -> usize {
        self.entries.iter().map(|e| e.defects.len()).sum()
    }
}

/// Why a receipt failed verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptDefect {
    /// Wrong or missing receipt schema version.
    #[error("unexpected receipt schema version: {0:?}")]
    WrongSchemaVersion(String),

    /// The receipt is not marked sealed.
    #[error("receipt is not sealed")]
    NotSealed,

    /// The receipt carries no signature.
    #[error("receipt carries no signature")]
    MissingSignature,

    /// The supplied public key is not the receipt's signing identity.
    #[error("public key fingerprint {actual} does not match receipt fingerprint {expected}")]
    FingerprintMismatch {
        /// The receipt's fingerprint.
        expected: String,
        /// The supplied key's fingerprint.
        actual: String,
    },

    /// The signature does not verify over the pre-anchor bytes.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The recomputed anchor hash differs from the stored one.
    #[error("anchor hash mismatch: recomputed {expected}, stored {actual}")]
    AnchorHashMismatch {
        /// The recomputed anchor hash.
        expected: String,
        /// The stored anchor hash.
        actual: String,
    },

    /// The receipt could not be canonicalized for recomputation.
    #[error("receipt canonicalization failed: {0}")]
    Canonicalization(String),
}
