//! # vault-crypto — Cryptographic Primitives for the Vault Stack
//!
//! This crate provides the cryptographic building blocks used throughout
//! the workspace:
//!
//! - **Ed25519** signing and verification for anchor receipts. Signing
//!   input is always [`CanonicalBytes`](vault_core::CanonicalBytes); you
//!   cannot sign raw bytes, which rules out the canonicalization split
//!   defect by construction.
//! - **Key providers** abstracting where the vault key lives (in-memory,
//!   seed file, environment variable), with zeroize-on-drop key material.
//! - **Public-key archive** mapping vault fingerprints to public keys so
//!   receipts remain verifiable after key rotation.
//! - **Content-addressed payload store** with idempotent `put`, verified
//!   `get`, and mirroring to an external CAS behind a narrow trait.

pub mod archive;
pub mod cas;
pub mod ed25519;
pub mod error;
pub mod key_provider;

// Re-export primary types.
pub use archive::PublicKeyArchive;
pub use cas::{ContentStore, ExternalCas};
pub use ed25519::{
    generate_seed, verify, verify_with_public_key, Ed25519PublicKey, Ed25519Signature, SigningKey,
    VaultFingerprint,
};
pub use error::CryptoError;
pub use key_provider::{EnvKeyProvider, FileKeyProvider, KeyProvider, KeySource, LocalKeyProvider};
