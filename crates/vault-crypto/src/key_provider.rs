//! # Key Provider Abstraction
//!
//! Abstracts Ed25519 key storage and signing behind a trait, enabling
//! multiple backends:
//!
//! - [`LocalKeyProvider`]: in-memory key for development and testing.
//! - [`FileKeyProvider`]: loads a hex-encoded 32-byte seed from a file,
//!   zeroizing the intermediate buffers after the key is constructed.
//! - [`EnvKeyProvider`]: loads the seed from an environment variable, for
//!   container deployments where secrets arrive via environment.
//!
//! The `hsm` key source is recognized by configuration but no hardware
//! backend is compiled into this build; selecting it reports
//! `KeyUnavailable` rather than silently falling back to software keys.
//!
//! ## Security Invariants
//!
//! - Key material is zeroized on drop (dalek `zeroize` feature plus
//!   explicit zeroization of intermediate seed buffers).
//! - Providers are `Send + Sync` for use across threads.
//! - Signing input is `&CanonicalBytes`, never raw bytes.

use std::path::{Path, PathBuf};

use zeroize::Zeroize;

use vault_core::CanonicalBytes;

use crate::ed25519::{hex_to_bytes, Ed25519PublicKey, Ed25519Signature, SigningKey, VaultFingerprint};
use crate::error::CryptoError;

/// Trait for Ed25519 key storage and signing backends.
///
/// Implementations must be `Send + Sync`. Raw private key bytes are never
/// exposed through this trait.
pub trait KeyProvider: Send + Sync {
    /// Sign canonicalized data with the managed key.
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError>;

    /// Return the public half of the managed key.
    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError>;

    /// Return the fingerprint of the managed key.
    fn fingerprint(&self) -> Result<VaultFingerprint, CryptoError> {
        Ok(self.public_key()?.fingerprint())
    }

    /// Human-readable backend name for diagnostics.
    fn provider_name(&self) -> &str;
}

/// Where the vault key comes from. Mirrors the `anchor.key_source`
/// configuration option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Hex seed file on disk.
    File(PathBuf),
    /// Hex seed in the named environment variable.
    Env(String),
    /// Hardware security module. Recognized but not compiled in.
    Hsm,
}

impl KeySource {
    /// Load a key provider from this source.
    pub fn load(&self) -> Result<Box<dyn KeyProvider>, CryptoError> {
        match self {
            KeySource::File(path) => Ok(Box::new(FileKeyProvider::from_path(path)?)),
            KeySource::Env(var) => Ok(Box::new(EnvKeyProvider::from_env(var)?)),
            KeySource::Hsm => Err(CryptoError::KeyUnavailable(
                "no HSM backend is compiled into this build".to_string(),
            )),
        }
    }
}

/// Parse a 64-hex-char seed string into a signing key, zeroizing the
/// intermediate byte buffer.
fn key_from_seed_hex(hex: &str) -> Result<SigningKey, CryptoError> {
    let mut bytes = hex_to_bytes(hex)?;
    if bytes.len() != 32 {
        let n = bytes.len();
        bytes.zeroize();
        return Err(CryptoError::KeyError(format!(
            "seed must be 32 bytes (64 hex chars), got {n} bytes"
        )));
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&bytes);
    bytes.zeroize();
    let key = SigningKey::from_seed(&seed);
    seed.zeroize();
    Ok(key)
}

// ─── LocalKeyProvider ────────────────────────────────────────────────────

/// In-memory Ed25519 key provider for development and testing.
pub struct LocalKeyProvider {
    key: SigningKey,
}

impl LocalKeyProvider {
    /// Wrap an existing signing key.
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Generate a new random key using the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(),
        }
    }

    /// Create from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_seed(seed),
        }
    }
}

impl KeyProvider for LocalKeyProvider {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(data))
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "LocalKeyProvider"
    }
}

// ─── FileKeyProvider ─────────────────────────────────────────────────────

/// Loads an Ed25519 seed from a file containing 64 hex characters.
pub struct FileKeyProvider {
    key: SigningKey,
    path: PathBuf,
}

impl FileKeyProvider {
    /// Load the signing key from the given seed file.
    pub fn from_path(path: &Path) -> Result<Self, CryptoError> {
        let mut contents = std::fs::read_to_string(path).map_err(|e| {
            CryptoError::KeyError(format!("cannot read key file {}: {e}", path.display()))
        })?;
        let key = key_from_seed_hex(contents.trim());
        contents.zeroize();
        Ok(Self {
            key: key?,
            path: path.to_path_buf(),
        })
    }

    /// The path the key was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyProvider for FileKeyProvider {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(data))
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "FileKeyProvider"
    }
}

// ─── EnvKeyProvider ──────────────────────────────────────────────────────

/// Loads an Ed25519 seed from an environment variable holding 64 hex chars.
pub struct EnvKeyProvider {
    key: SigningKey,
    var_name: String,
}

impl EnvKeyProvider {
    /// Load the signing key from the named environment variable.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let mut hex = std::env::var(var_name).map_err(|_| {
            CryptoError::KeyError(format!("environment variable {var_name} not set"))
        })?;
        let key = key_from_seed_hex(&hex);
        hex.zeroize();
        Ok(Self {
            key: key?,
            var_name: var_name.to_string(),
        })
    }

    /// The environment variable name this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl KeyProvider for EnvKeyProvider {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(data))
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "EnvKeyProvider"
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
