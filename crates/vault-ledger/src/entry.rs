//! # Chain Entries and Log Frames
//!
//! [`ChainEntry`] is the per-record chain metadata the log persists next to
//! each record. Its `hash` commits to `{prev_hash, record_digest,
//! payload_cid, seq}`, deliberately excluding `ts_ingested`, which is
//! wall-clock observability data and must not influence replay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vault_core::{ContentDigest, PayloadCid, Timestamp};

/// One link in a stream's hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Hash of the predecessor entry; `null` at genesis (`seq == 0`).
    pub prev_hash: Option<ContentDigest>,
    /// This entry's chain hash: the digest of the canonical
    /// `{prev_hash, record_digest, payload_cid, seq}` object.
    pub hash: ContentDigest,
    /// Digest of the canonical record bytes.
    pub record_digest: ContentDigest,
    /// Content identifier of the record payload in the content store.
    pub payload_cid: PayloadCid,
    /// Position in the stream, starting at 0 and increasing by exactly 1.
    pub seq: u64,
    /// When the log ingested the record. Not part of any hash.
    pub ts_ingested: Timestamp,
}

/// The unit written to disk per append: the chain entry plus the record it
/// commits to, framed with a length prefix and CRC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFrame {
    /// The chain entry.
    pub entry: ChainEntry,
    /// The ingested record.
    pub record: Value,
}
