//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `vault-crypto`.
//! Uses `thiserror` for ergonomic error definitions with diagnostic context.

use thiserror::Error;

/// Errors from cryptographic operations in the vault stack.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation, parsing, or loading failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// The signer is not initialized or its key has been zeroized.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),

    /// Hex or base64url decoding error.
    #[error("decode error: {0}")]
    Decode(String),

    /// Content store operation error.
    #[error("content store error: {0}")]
    Cas(String),

    /// A mirrored payload came back from the external CAS under a
    /// different CID than the local one.
    #[error("CID mismatch: local {local}, external {external}")]
    CidMismatch {
        /// The locally computed CID.
        local: String,
        /// The CID the external store returned.
        external: String,
    },

    /// CID construction or parsing error.
    #[error("cid error: {0}")]
    Cid(#[from] vault_core::CidError),

    /// I/O error (filesystem-backed stores).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
