//! # Public-Key Archive
//!
//! A file-backed map from vault fingerprint to public key. Receipts signed
//! by a rotated-out key remain verifiable forever: the archive is the
//! durable record of every signing identity the vault has ever used.
//!
//! Layout: `{base_dir}/{fingerprint_hex}.pub`, each file holding the
//! 64-hex-char public key. Registration is idempotent; a file whose
//! contents do not match its fingerprint is reported as corrupted.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ed25519::{Ed25519PublicKey, VaultFingerprint};
use crate::error::CryptoError;

/// File-backed public-key archive.
#[derive(Debug, Clone)]
pub struct PublicKeyArchive {
    base_dir: PathBuf,
}

impl PublicKeyArchive {
    /// Create an archive rooted at the given directory. The directory is
    /// created on first registration.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Return the archive root.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, fingerprint: &VaultFingerprint) -> PathBuf {
        self.base_dir.join(format!("{}.pub", fingerprint.to_hex()))
    }

    /// Register a public key, returning its fingerprint.
    ///
    /// Idempotent: re-registering the same key is a no-op. The write uses
    /// create-if-absent so concurrent registration of the same key cannot
    /// race into a torn file.
    pub fn register(&self, public_key: &Ed25519PublicKey) -> Result<VaultFingerprint, CryptoError> {
        let fingerprint = public_key.fingerprint();
        fs::create_dir_all(&self.base_dir)?;
        let path = self.path_for(&fingerprint);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => {
                use std::io::Write;
                f.write_all(public_key.to_hex().as_bytes())?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Fingerprint-addressed: identical name means identical key.
            }
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(fingerprint = %fingerprint, "public key registered");
        Ok(fingerprint)
    }

    /// Look up the public key for a fingerprint.
    ///
    /// Returns `Ok(None)` when the fingerprint is unknown. A stored key
    /// whose recomputed fingerprint does not match its filename is
    /// corruption and is reported as an error, not returned.
    pub fn lookup(
        &self,
        fingerprint: &VaultFingerprint,
    ) -> Result<Option<Ed25519PublicKey>, CryptoError> {
        let path = self.path_for(fingerprint);
        if !path.exists() {
            return Ok(None);
        }
        let hex = fs::read_to_string(&path)?;
        let key = Ed25519PublicKey::from_hex(hex.trim())?;
        if key.fingerprint() != *fingerprint {
            return Err(CryptoError::Cas(format!(
                "archive entry {} does not match its fingerprint",
                path.display()
            )));
        }
        Ok(Some(key))
    }

    /// List every fingerprint in the archive, sorted.
    pub fn list(&self) -> Result<Vec<VaultFingerprint>, CryptoError> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pub") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(fp) = VaultFingerprint::from_hex(stem) {
                    out.push(fp);
                }
            }
        }
        out.sort_by_key(|fp| fp.to_hex());
        Ok(out)
    }
}
