//! # Content-Addressed Payload Store
//!
//! Stores payload bytes under their content identifier. A blob lives at
//! `{base_dir}/{digest_hex}` where the digest is the SHA2-256 carried by
//! the payload's CID.
//!
//! ## Integrity Invariant
//!
//! Every retrieval recomputes the digest of the stored bytes and compares
//! it (constant-time) against the requested CID. Corruption or substitution
//! is detected at read time, never silently returned.
//!
//! ## Idempotence
//!
//! `put` of identical bytes returns the same CID and does not duplicate
//! storage. Writes use `OpenOptions::create_new`, so concurrent identical
//! puts collapse to one stored blob without a TOCTOU window.

use std::fs;
use std::path::{Path, PathBuf};

use subtle::ConstantTimeEq;

use vault_core::{CanonicalBytes, CidCodec, PayloadCid};

use crate::error::CryptoError;

/// Narrow interface to an external content-addressed store (an IPFS
/// gateway, an object store, a peer vault). The vault never depends on the
/// external store for correctness; mirroring is an optional replication
/// step whose result must agree with the local CID.
pub trait ExternalCas: Send + Sync {
    /// Store the payload externally and return the CID the external store
    /// computed for it.
    fn put(&self, codec: CidCodec, bytes: &[u8]) -> Result<PayloadCid, CryptoError>;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;
}

/// A filesystem-backed content-addressed payload store.
#[derive(Debug, Clone)]
pub struct ContentStore {
    base_dir: PathBuf,
    codec: CidCodec,
}

impl ContentStore {
    /// Create a store rooted at the given directory with the default
    /// (`raw`) codec. The directory is created on first `put`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_codec(base_dir, CidCodec::default())
    }

    /// Create a store with an explicit codec.
    pub fn with_codec(base_dir: impl Into<PathBuf>, codec: CidCodec) -> Self {
        Self {
            base_dir: base_dir.into(),
            codec,
        }
    }

    /// The store's root directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The codec this store tags payloads with.
    pub fn codec(&self) -> CidCodec {
        self.codec
    }

    fn blob_path(&self, cid: &PayloadCid) -> Result<PathBuf, CryptoError> {
        Ok(self.base_dir.join(cid.digest_hex()?))
    }

    /// Store payload bytes, returning their CID.
    ///
    /// Idempotent: identical bytes yield the same CID and at most one blob.
    pub fn put(&self, bytes: &[u8]) -> Result<PayloadCid, CryptoError> {
        let cid = PayloadCid::from_payload(self.codec, bytes);
        fs::create_dir_all(&self.base_dir)?;
        let path = self.blob_path(&cid)?;
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => {
                use std::io::Write;
                f.write_all(bytes)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Content-addressed: identical digest means identical content.
            }
            Err(e) => return Err(e.into()),
        }
        Ok(cid)
    }

    /// Store a canonical record payload.
    pub fn put_canonical(&self, canonical: &CanonicalBytes) -> Result<PayloadCid, CryptoError> {
        self.put(canonical.as_bytes())
    }

    /// Retrieve payload bytes by CID.
    ///
    /// Returns `Ok(None)` when the CID is not stored. Stored bytes whose
    /// recomputed digest does not match the CID are corruption and are
    /// reported as an error.
    pub fn get(&self, cid: &PayloadCid) -> Result<Option<Vec<u8>>, CryptoError> {
        let path = self.blob_path(cid)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let recomputed = PayloadCid::from_payload(cid.codec()?, &bytes);
        let expected = cid.digest()?;
        let actual = recomputed.digest()?;
        if !bool::from(actual.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(CryptoError::Cas(format!(
                "integrity violation: blob at {} rehashes to {} but its name says {}",
                path.display(),
                actual.to_hex(),
                expected.to_hex(),
            )));
        }
        Ok(Some(bytes))
    }

    /// Check whether a payload is stored.
    pub fn has(&self, cid: &PayloadCid) -> Result<bool, CryptoError> {
        Ok(self.blob_path(cid)?.exists())
    }

    /// Forward a stored payload to an external CAS.
    ///
    /// The CID the external store returns MUST equal the local CID;
    /// divergence fails `CidMismatch` and the local store is unaffected.
    pub fn mirror_to(
        &self,
        cid: &PayloadCid,
        external: &dyn ExternalCas,
    ) -> Result<PayloadCid, CryptoError> {
        let bytes = self.get(cid)?.ok_or_else(|| {
            CryptoError::Cas(format!("cannot mirror unknown payload {cid}"))
        })?;
        let external_cid = external.put(cid.codec()?, &bytes)?;
        if external_cid != *cid {
            return Err(CryptoError::CidMismatch {
                local: cid.to_string(),
                external: external_cid.to_string(),
            });
        }
        tracing::debug!(cid = %cid, target = external.name(), "payload mirrored");
        Ok(external_cid)
    }
}
