//! # Ed25519 Signing and Verification
//!
//! Ed25519 key handling for anchor receipts and capsule attestations.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`; you cannot sign raw bytes.
//! - Private keys are never serialized or logged. [`SigningKey`] does not
//!   implement `Serialize`, its `Debug` impl is redacted, and the inner
//!   dalek key zeroizes on drop.
//! - Digest and signature equality checks use constant-time comparison.
//!
//! ## Serde
//!
//! - Public keys serialize as hex-encoded strings (64 chars).
//! - Signatures serialize as base64url without padding (86 chars), the
//!   boundary encoding carried in receipts and ledger lines.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use vault_core::{CanonicalBytes, ContentDigest};

use crate::error::CryptoError;

/// An Ed25519 public key (32 bytes) for signature verification.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// The digest of a vault public key: the signing identity.
///
/// Every anchor stream is bound to exactly one fingerprint; rotation
/// produces a new fingerprint and therefore a new stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultFingerprint(ContentDigest);

/// An Ed25519 signing key.
///
/// Does not implement `Serialize`: private keys must never land in logs,
/// responses, or artifacts. The inner dalek key zeroizes on drop.
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey impls
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Create a public key from raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex_to_bytes(hex)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::KeyError("public key hex must be 64 chars".to_string()))?;
        Ok(Self(arr))
    }

    /// The fingerprint of this key: SHA-256 of the raw public key bytes.
    pub fn fingerprint(&self) -> VaultFingerprint {
        VaultFingerprint(ContentDigest::from_bytes(sha256_raw(&self.0)))
    }

    /// Convert to an `ed25519_dalek::VerifyingKey`.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature impls
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Create a signature from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Return the raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render the signature as base64url without padding.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Parse a signature from its base64url form.
    pub fn from_base64url(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| CryptoError::Decode(format!("invalid base64url signature: {e}")))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            CryptoError::Decode(format!("signature must be 64 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }

    /// Constant-time equality against another signature.
    pub fn ct_eq(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64url())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64url(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64url())
    }
}

// ---------------------------------------------------------------------------
// VaultFingerprint impls
// ---------------------------------------------------------------------------

impl VaultFingerprint {
    /// Render as 64 lowercase hex chars.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Parse from hex.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        Ok(Self(
            ContentDigest::from_hex(hex).map_err(CryptoError::Cid)?,
        ))
    }

    /// Access the underlying digest.
    pub fn as_digest(&self) -> &ContentDigest {
        &self.0
    }

    /// A short prefix for stream naming and diagnostics.
    pub fn short(&self) -> String {
        self.to_hex()[..16].to_string()
    }
}

impl std::fmt::Display for VaultFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// SigningKey impls
// ---------------------------------------------------------------------------

impl SigningKey {
    /// Generate a new random key using the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand_core::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a key from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.inner.verifying_key().to_bytes())
    }

    /// The fingerprint of the public half.
    pub fn fingerprint(&self) -> VaultFingerprint {
        self.public_key().fingerprint()
    }

    /// Sign canonical bytes.
    ///
    /// The input type enforces that everything this key ever signs has
    /// passed through the canonicalization pipeline.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        let sig = self.inner.sign(data.as_bytes());
        Ed25519Signature(sig.to_bytes())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<private>)")
    }
}

/// Draw a fresh 32-byte Ed25519 seed from the OS CSPRNG.
///
/// For provisioning tools that persist the seed; running services load
/// keys through a [`crate::key_provider::KeyProvider`] instead.
pub fn generate_seed() -> [u8; 32] {
    use rand_core::RngCore;
    let mut seed = [0u8; 32];
    rand_core::OsRng.fill_bytes(&mut seed);
    seed
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify an Ed25519 signature over canonical bytes.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    verifying_key: &ed25519_dalek::VerifyingKey,
) -> Result<(), CryptoError> {
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key
        .verify(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(format!("ed25519: {e}")))
}

/// Verify using an [`Ed25519PublicKey`] instead of a dalek key.
pub fn verify_with_public_key(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let vk = public_key.to_verifying_key()?;
    verify(data, signature, &vk)
}

// ---------------------------------------------------------------------------
// Raw hashing and hex utilities
// ---------------------------------------------------------------------------

/// SHA-256 over raw bytes. Used only for key fingerprints, where the
/// hashed unit is the key bytes themselves rather than a record.
pub(crate) fn sha256_raw(b: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(b);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, CryptoError> {
    let hex = hex.trim().to_lowercase();
    if hex.len() % 2 != 0 {
        return Err(CryptoError::Decode(
            "hex string must have even length".to_string(),
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| CryptoError::Decode(format!("invalid hex at position {i}: {e}")))
        })
        .collect()
}
