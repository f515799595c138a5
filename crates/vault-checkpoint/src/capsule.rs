//! # Checkpoint Capsules
//!
//! The canonical record a producer's snapshot becomes. Every field is part
//! of the hashed payload; nothing here may carry wall-clock time, host
//! names, or absolute paths.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vault_core::{ContentDigest, PayloadCid, StreamId};

/// Schema version carried by every capsule.
pub const CAPSULE_SCHEMA_VERSION: &str = "CheckpointCapsule.v1";

/// A canonical snapshot of producer state at a tick, linked to its
/// predecessor capsule by CID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointCapsule {
    /// Always [`CAPSULE_SCHEMA_VERSION`].
    pub schema_version: String,
    /// The stream this capsule belongs to.
    pub stream_id: StreamId,
    /// Producer-supplied monotonic tick.
    pub tick: u64,
    /// Digest of the canonical producer state.
    pub state_digest: ContentDigest,
    /// CID of the producer state payload in the content store.
    pub state_payload_cid: PayloadCid,
    /// The previous capsule's payload CID, or `null` at genesis.
    pub parent_capsule_cid: Option<PayloadCid>,
    /// Producer-declared metadata (seed, unit declarations, schema hints).
    /// Must itself be canonical: integers only, no clocks.
    pub producer_metadata: Value,
}

impl CheckpointCapsule {
    /// Decode a capsule from a stored record.
    pub fn from_record(record: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record.clone())
    }

    /// The seed declared in `producer_metadata`, if any. Used by the
    /// replay verifier to re-execute deterministic producers.
    pub fn declared_seed(&self) -> Option<u64> {
        self.producer_metadata.get("seed").and_then(|v| v.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vault_core::{CanonicalBytes, CidCodec};

    fn sample() -> CheckpointCapsule {
        let state = CanonicalBytes::new(&json!({"pos_mm": 1200})).unwrap();
        CheckpointCapsule {
            schema_version: CAPSULE_SCHEMA_VERSION.to_string(),
            stream_id: StreamId::new("race-42").unwrap(),
            tick: 7,
            state_digest: vault_core::sha256_digest(&state),
            state_payload_cid: PayloadCid::from_canonical(CidCodec::Raw, &state),
            parent_capsule_cid: None,
            producer_metadata: json!({"seed": 42}),
        }
    }

    #[test]
    fn record_round_trip() {
        let capsule = sample();
        let record = serde_json::to_value(&capsule).unwrap();
        let back = CheckpointCapsule::from_record(&record).unwrap();
        assert_eq!(capsule, back);
    }

    #[test]
    fn genesis_parent_serializes_as_null() {
        let record = serde_json::to_value(sample()).unwrap();
        assert!(record["parent_capsule_cid"].is_null());
    }

    #[test]
    fn declared_seed_extraction() {
        let capsule = sample();
        assert_eq!(capsule.declared_seed(), Some(42));

        let mut unseeded = sample();
        unseeded.producer_metadata = json!({});
        assert_eq!(unseeded.declared_seed(), None);
    }

    #[test]
    fn capsule_is_canonicalizable() {
        let record = serde_json::to_value(sample()).unwrap();
        assert!(CanonicalBytes::from_value(record).is_ok());
    }
}
