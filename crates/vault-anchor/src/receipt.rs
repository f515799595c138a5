//! # Anchor Requests, Receipts, and Ledger Lines
//!
//! Wire shapes of the `VaultAnchorWrite.v1` contract and the two
//! commitment computations over receipts:
//!
//! ```text
//! signature   = Sign(vault_key, JCS(receipt with anchor_hash="" and signature removed))
//! anchor_hash = SHA256(JCS(receipt with anchor_hash="" and signature present))
//! ```
//!
//! Both computations strip-and-substitute on the serialized value, so the
//! stored `anchor_hash` never influences its own preimage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vault_core::{
    sha256_digest, AnchorId, CanonicalBytes, CanonicalizationError, ContentDigest, Timestamp,
};
use vault_crypto::{Ed25519Signature, VaultFingerprint};

use crate::error::AnchorError;

/// Schema version of anchor write requests.
pub const REQUEST_SCHEMA_VERSION: &str = "VaultAnchorWriteRequest.v1";
/// Schema version of fossilization receipts.
pub const RECEIPT_SCHEMA_VERSION: &str = "VaultFossilizationReceipt.v1";
/// Schema version of persisted ledger lines.
pub const LEDGER_LINE_SCHEMA_VERSION: &str = "VaultLedgerLine.v1";

// ---------------------------------------------------------------------------
// AnchorRequest
// ---------------------------------------------------------------------------

/// A `VaultAnchorWriteRequest.v1`. The caller has already hashed its
/// payload; the vault stores metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRequest {
    /// Always [`REQUEST_SCHEMA_VERSION`].
    pub schema_version: String,
    /// What kind of artifact the payload is (e.g. `InferenceReceipt.v1`).
    pub artifact_kind: String,
    /// SHA-256 of the caller's canonical payload, 64 lowercase hex chars.
    pub payload_hash_sha256: String,
    /// The run that produced the payload.
    pub run_id: String,
    /// Who requested the anchor.
    pub operator: String,
    /// Caller-supplied ISO-8601 UTC timestamp.
    pub ts: String,
}

impl AnchorRequest {
    /// Decode a request from a JSON body, reporting the first absent or
    /// non-string field.
    pub fn from_value(value: &Value) -> Result<Self, AnchorError> {
        let obj = value
            .as_object()
            .ok_or(AnchorError::MissingRequiredField("schema_version"))?;
        let field = |name: &'static str| -> Result<String, AnchorError> {
            obj.get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or(AnchorError::MissingRequiredField(name))
        };
        Ok(Self {
            schema_version: field("schema_version")?,
            artifact_kind: field("artifact_kind")?,
            payload_hash_sha256: field("payload_hash_sha256")?,
            run_id: field("run_id")?,
            operator: field("operator")?,
            ts: field("ts")?,
        })
    }

    /// Validate request structure. No state is touched.
    pub fn validate(&self) -> Result<(), AnchorError> {
        if self.schema_version != REQUEST_SCHEMA_VERSION {
            return Err(AnchorError::InvalidSchemaVersion(self.schema_version.clone()));
        }
        if !is_lower_hex_64(&self.payload_hash_sha256) {
            return Err(AnchorError::InvalidPayloadHash(
                self.payload_hash_sha256.clone(),
            ));
        }
        if self.artifact_kind.is_empty() {
            return Err(AnchorError::MissingRequiredField("artifact_kind"));
        }
        if Timestamp::parse(&self.ts).is_err() {
            return Err(AnchorError::InvalidTimestamp(self.ts.clone()));
        }
        Ok(())
    }
}

fn is_lower_hex_64(s: &str) -> bool {
    s.len() == 64
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

// ---------------------------------------------------------------------------
// AnchorReceipt
// ---------------------------------------------------------------------------

/// A sealed `VaultFossilizationReceipt.v1`.
///
/// `signature` is optional in the struct so the pre-anchor form can be
/// built before signing; a receipt returned by the service always carries
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    /// Always [`RECEIPT_SCHEMA_VERSION`].
    pub schema_version: String,
    /// Copied from the request.
    pub artifact_kind: String,
    /// Copied from the request's `payload_hash_sha256`.
    pub payload_hash: String,
    /// Digest of the signing key's public half.
    pub vault_fingerprint: VaultFingerprint,
    /// Opaque anchor identifier. Only uniqueness is promised.
    pub anchor_id: AnchorId,
    /// Digest of the sealed receipt (see module docs). Empty until sealed.
    pub anchor_hash: String,
    /// Service clock at sealing time. Signed, but not part of any
    /// determinism check.
    pub ts: Timestamp,
    /// Always `true` on issued receipts.
    pub sealed: bool,
    /// Ed25519 signature over the pre-anchor bytes, base64url.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<Ed25519Signature>,
}

fn receipt_value_without(
    receipt: &AnchorReceipt,
    strip_signature: bool,
) -> Result<Value, CanonicalizationError> {
    let mut value = serde_json::to_value(receipt)?;
    let obj = value.as_object_mut().ok_or_else(|| {
        CanonicalizationError::SerializationFailed(<serde_json::Error as serde::ser::Error>::custom(
            "AnchorReceipt did not serialize to a JSON object",
        ))
    })?;
    if strip_signature {
        obj.remove("signature");
    }
    obj.insert("anchor_hash".to_string(), Value::String(String::new()));
    Ok(value)
}

/// Canonical bytes of the pre-anchor receipt: `anchor_hash` emptied,
/// `signature` removed. This is the signed message.
pub fn pre_anchor_bytes(receipt: &AnchorReceipt) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::from_value(receipt_value_without(receipt, true)?)
}

/// The anchor hash: digest of the receipt with `anchor_hash` emptied and
/// the signature present. The stored `anchor_hash` value never affects
/// the result.
pub fn compute_anchor_hash(receipt: &AnchorReceipt) -> Result<ContentDigest, CanonicalizationError> {
    let canonical = CanonicalBytes::from_value(receipt_value_without(receipt, false)?)?;
    Ok(sha256_digest(&canonical))
}

// ---------------------------------------------------------------------------
// AnchorLedgerLine
// ---------------------------------------------------------------------------

/// The persisted projection of a receipt: one `VaultLedgerLine.v1` per
/// appended anchor in the anchor stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorLedgerLine {
    /// Always [`LEDGER_LINE_SCHEMA_VERSION`].
    pub schema_version: String,
    /// The minted anchor id.
    pub anchor_id: AnchorId,
    /// Copied from the receipt.
    pub artifact_kind: String,
    /// The anchored payload hash. Dedup key within the stream.
    pub payload_hash: String,
    /// The signing identity.
    pub vault_fingerprint: VaultFingerprint,
    /// The sealed receipt's anchor hash.
    pub anchor_hash: String,
    /// Sealing time.
    pub ts: Timestamp,
    /// Always `true`.
    pub sealed: bool,
    /// The receipt signature.
    pub signature: Ed25519Signature,
}

impl AnchorLedgerLine {
    /// Project a sealed receipt into its ledger line.
    pub fn from_receipt(receipt: &AnchorReceipt) -> Result<Self, AnchorError> {
        let signature = receipt
            .signature
            .clone()
            .ok_or(AnchorError::MissingRequiredField("signature"))?;
        Ok(Self {
            schema_version: LEDGER_LINE_SCHEMA_VERSION.to_string(),
            anchor_id: receipt.anchor_id,
            artifact_kind: receipt.artifact_kind.clone(),
            payload_hash: receipt.payload_hash.clone(),
            vault_fingerprint: receipt.vault_fingerprint,
            anchor_hash: receipt.anchor_hash.clone(),
            ts: receipt.ts,
            sealed: receipt.sealed,
            signature,
        })
    }

    /// Decode a ledger line from a stored record.
    pub fn from_record(record: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record.clone())
    }
}
