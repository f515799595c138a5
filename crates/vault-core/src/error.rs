//! # Error Types — Core Error Taxonomy
//!
//! Errors for canonicalization, CID handling, timestamps, and identifier
//! validation. All errors use `thiserror` for derive-based `Display` and
//! `Error` implementations.
//!
//! Errors are values: nothing in this crate panics on malformed input.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values never enter the hash domain. Rational quantities must be
    /// pre-quantized to integers in a declared unit before ingestion.
    #[error("invalid scalar: float {0} is not permitted in canonical records; quantize to an integer")]
    InvalidScalar(f64),

    /// An object key appeared more than once in the JSON source.
    #[error("duplicate object key: {0}")]
    DuplicateKey(String),

    /// A mapping key was not a string.
    #[error("non-string mapping key: {0}")]
    NonStringKey(String),

    /// Recursion bound exceeded while walking the record tree. Producer
    /// state must be a DAG projected into a tree of bounded depth.
    #[error("cycle suspected: record nesting exceeds {max_depth} levels")]
    CycleDetected {
        /// The depth bound that was exceeded.
        max_depth: usize,
    },

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error constructing or parsing a content identifier.
#[derive(Error, Debug)]
pub enum CidError {
    /// The CID string could not be parsed.
    #[error("invalid CID: {0}")]
    Parse(String),

    /// The CID carries a codec this stack does not recognize.
    #[error("unknown CID codec: 0x{0:x}")]
    UnknownCodec(u64),

    /// The CID multihash is not SHA2-256.
    #[error("unsupported multihash code: 0x{0:x} (expected sha2-256)")]
    UnsupportedMultihash(u64),
}

/// Error parsing or validating a timestamp.
#[derive(Error, Debug)]
pub enum TimeError {
    /// Not a valid ISO-8601 timestamp.
    #[error("invalid timestamp {value:?}: {reason}")]
    Invalid {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Valid ISO-8601 but not UTC with a Z suffix.
    #[error("timestamp {0:?} must be UTC with a Z suffix")]
    NotUtc(String),
}

/// Error validating an identifier newtype.
#[derive(Error, Debug)]
pub enum IdError {
    /// Stream names must match `^[a-z0-9][a-z0-9._-]{0,63}$`.
    #[error("invalid stream id {0:?}: must match ^[a-z0-9][a-z0-9._-]{{0,63}}$")]
    InvalidStreamId(String),

    /// The anchor id could not be parsed as a UUID.
    #[error("invalid anchor id: {0}")]
    InvalidAnchorId(String),
}
