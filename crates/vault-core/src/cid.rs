//! # Content Identifiers — CIDv1 Construction
//!
//! Payloads in the content store are addressed by CIDv1: a codec tag plus a
//! SHA2-256 multihash over the payload bytes. Two payloads have the same
//! `PayloadCid` iff their bytes are identical.
//!
//! The codec defaults to `raw`; `dag-json` is available for payloads that
//! are themselves canonical JSON. The digest algorithm is fixed to
//! SHA2-256 so that a payload's CID and its `ContentDigest` always carry
//! the same 32 bytes.

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::canonical::CanonicalBytes;
use crate::digest::ContentDigest;
use crate::error::CidError;

/// Multicodec code for raw binary payloads.
const CODEC_RAW: u64 = 0x55;
/// Multicodec code for dag-json payloads.
const CODEC_DAG_JSON: u64 = 0x0129;
/// Multihash code for SHA2-256.
const MULTIHASH_SHA2_256: u64 = 0x12;

/// The codec tag carried by a payload CID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CidCodec {
    /// Raw binary payload (default).
    #[default]
    Raw,
    /// Payload is canonical JSON.
    DagJson,
}

impl CidCodec {
    /// The multicodec code for this codec.
    pub fn code(self) -> u64 {
        match self {
            CidCodec::Raw => CODEC_RAW,
            CidCodec::DagJson => CODEC_DAG_JSON,
        }
    }

    /// Resolve a multicodec code back to a codec tag.
    pub fn from_code(code: u64) -> Result<Self, CidError> {
        match code {
            CODEC_RAW => Ok(CidCodec::Raw),
            CODEC_DAG_JSON => Ok(CidCodec::DagJson),
            other => Err(CidError::UnknownCodec(other)),
        }
    }
}

/// A CIDv1 content identifier for a stored payload.
///
/// Serializes as the canonical CID string (base32, lowercase) so it can be
/// embedded in hashed records deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayloadCid(Cid);

impl PayloadCid {
    /// Compute the CID of a byte payload under the given codec.
    pub fn from_payload(codec: CidCodec, bytes: &[u8]) -> Self {
        let mh = Code::Sha2_256.digest(bytes);
        Self(Cid::new_v1(codec.code(), mh))
    }

    /// Compute the CID of a canonical record payload.
    pub fn from_canonical(codec: CidCodec, canonical: &CanonicalBytes) -> Self {
        Self::from_payload(codec, canonical.as_bytes())
    }

    /// Parse a CID from its canonical string form.
    ///
    /// Rejects CIDs whose codec this stack does not recognize or whose
    /// multihash is not SHA2-256.
    pub fn parse(s: &str) -> Result<Self, CidError> {
        let cid = Cid::try_from(s).map_err(|e| CidError::Parse(e.to_string()))?;
        CidCodec::from_code(cid.codec())?;
        if cid.hash().code() != MULTIHASH_SHA2_256 {
            return Err(CidError::UnsupportedMultihash(cid.hash().code()));
        }
        Ok(Self(cid))
    }

    /// The codec tag of this CID.
    pub fn codec(&self) -> Result<CidCodec, CidError> {
        CidCodec::from_code(self.0.codec())
    }

    /// The SHA2-256 digest carried by this CID.
    ///
    /// This equals `ContentDigest` of the payload bytes, which is what makes
    /// digest-addressed storage and CID-addressed retrieval interchangeable.
    pub fn digest(&self) -> Result<ContentDigest, CidError> {
        let raw = self.0.hash().digest();
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| CidError::Parse(format!("multihash digest is {} bytes", raw.len())))?;
        Ok(ContentDigest::from_bytes(bytes))
    }

    /// Hex rendering of the underlying SHA2-256 digest, used as the blob
    /// filename in the content store.
    pub fn digest_hex(&self) -> Result<String, CidError> {
        Ok(self.digest()?.to_hex())
    }
}

impl std::fmt::Display for PayloadCid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PayloadCid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PayloadCid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
