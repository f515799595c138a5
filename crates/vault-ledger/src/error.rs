//! # Ledger Error Types
//!
//! Structured errors for stream persistence. The taxonomy distinguishes
//! validation failures (no state change), integrity failures (stream
//! halted until operator reset), and infrastructure failures (retryable).

use thiserror::Error;

use vault_core::StreamId;

/// Errors from append-log and chain operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Another appender holds the write lock, or the stream is halted
    /// after an integrity failure and awaits operator reset.
    #[error("stream {stream} locked: {reason}")]
    StreamLocked {
        /// The affected stream.
        stream: StreamId,
        /// Why the stream is unavailable for writes.
        reason: String,
    },

    /// A frame failed its checksum or could not be decoded.
    #[error("corrupt entry in stream {stream} at seq {seq}: {reason}")]
    CorruptEntry {
        /// The affected stream.
        stream: StreamId,
        /// Sequence number of the corrupt frame.
        seq: u64,
        /// What failed.
        reason: String,
    },

    /// The requested sequence number does not exist in the stream.
    #[error("stream {stream} has no entry at seq {seq}")]
    NoSuchEntry {
        /// The stream that was queried.
        stream: StreamId,
        /// The missing sequence number.
        seq: u64,
    },

    /// The deadline expired before the write lock was acquired. No state
    /// was changed.
    #[error("timed out waiting for the write lock on stream {stream}")]
    Timeout {
        /// The contended stream.
        stream: StreamId,
    },

    /// Record rejected by the schema registry.
    #[error("record failed schema validation for {schema_version}: {detail}")]
    SchemaValidation {
        /// The `schema_version` the record declared.
        schema_version: String,
        /// Validator output.
        detail: String,
    },

    /// The supplied payload CID does not address the record being appended.
    #[error("payload cid does not address the record in stream {stream}: cid digest {cid_digest}, record digest {record_digest}")]
    PayloadMismatch {
        /// The affected stream.
        stream: StreamId,
        /// The digest the CID carries.
        cid_digest: String,
        /// The digest of the canonical record bytes.
        record_digest: String,
    },

    /// Record rejected by the canonicalizer.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] vault_core::CanonicalizationError),

    /// CID handling error.
    #[error("cid error: {0}")]
    Cid(#[from] vault_core::CidError),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}
