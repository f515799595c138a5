//! # Anchor Error Types
//!
//! The error kinds the adapter maps to transport status codes: validation
//! failures and `DuplicateAnchor` change no state; `KeyUnavailable` and
//! the storage variants are infrastructure conditions. Signing is never
//! retried by this crate.

use thiserror::Error;

/// Errors from anchor operations.
#[derive(Error, Debug)]
pub enum AnchorError {
    /// The request's `schema_version` is unsupported or missing.
    #[error("invalid schema version: {0:?} (expected VaultAnchorWriteRequest.v1)")]
    InvalidSchemaVersion(String),

    /// `payload_hash_sha256` is not 64 lowercase hex characters.
    #[error("invalid payload hash: {0:?}")]
    InvalidPayloadHash(String),

    /// A required request field is absent or not a string.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// `ts` is not ISO-8601 UTC with a Z suffix.
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The payload hash is already anchored in this stream.
    #[error("payload hash {0} is already anchored")]
    DuplicateAnchor(String),

    /// A receipt or ledger line failed canonicalization.
    #[error("canonicalization failed: {0}")]
    CanonicalizationFailed(#[from] vault_core::CanonicalizationError),

    /// The vault key is not loaded or has been zeroized.
    #[error("vault key unavailable: {0}")]
    KeyUnavailable(String),

    /// The deadline expired before the anchor lock was acquired. No state
    /// was changed.
    #[error("timed out waiting for the anchor stream")]
    Timeout,

    /// Append log failure.
    #[error("append log error: {0}")]
    Ledger(#[from] vault_ledger::LedgerError),

    /// Content store or signing backend failure.
    #[error("crypto backend error: {0}")]
    Crypto(vault_crypto::CryptoError),
}

impl From<vault_crypto::CryptoError> for AnchorError {
    fn from(err: vault_crypto::CryptoError) -> Self {
        match err {
            vault_crypto::CryptoError::KeyUnavailable(msg) => Self::KeyUnavailable(msg),
            other => Self::Crypto(other),
        }
    }
}
