//! # Checkpoint Error Types

use thiserror::Error;

use vault_core::StreamId;

/// Errors from checkpoint operations.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The producer supplied a tick that violates the stream's
    /// monotonicity rule. No state was changed.
    #[error("checkpoint out of order on stream {stream}: tick {tick} after {last_tick}")]
    OutOfOrder {
        /// The stream being checkpointed.
        stream: StreamId,
        /// The last accepted tick.
        last_tick: u64,
        /// The offending tick.
        tick: u64,
    },

    /// The producer state was rejected by the canonicalizer. Producers
    /// must quantize floats and strip wall-clock fields before snapshot.
    #[error("producer state is not canonical: {0}")]
    ProducerStateNonCanonical(#[from] vault_core::CanonicalizationError),

    /// The stream tip could not be interpreted as a capsule.
    #[error("stream {stream} tip at seq {seq} is not a checkpoint capsule: {reason}")]
    ForeignTip {
        /// The stream being checkpointed.
        stream: StreamId,
        /// The tip's sequence number.
        seq: u64,
        /// Why decoding failed.
        reason: String,
    },

    /// The deadline expired before the stream's snapshot lock was
    /// acquired. No state was changed.
    #[error("timed out waiting to snapshot stream {stream}")]
    Timeout {
        /// The contended stream.
        stream: StreamId,
    },

    /// Content store failure.
    #[error("content store error: {0}")]
    Store(#[from] vault_crypto::CryptoError),

    /// Append log failure.
    #[error("append log error: {0}")]
    Ledger(#[from] vault_ledger::LedgerError),
}
