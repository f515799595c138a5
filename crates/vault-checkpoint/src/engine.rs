//! # Checkpoint Engine
//!
//! Per-stream snapshot pipeline: canonicalize producer state, store the
//! payload, link the capsule to the stream tip, append. Snapshots on the
//! same stream are serialized by a per-stream lock so the parent lookup
//! and the append form one atomic step; streams snapshot in parallel.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use vault_core::{sha256_digest, CanonicalBytes, ContentDigest, PayloadCid, StreamId};
use vault_crypto::ContentStore;
use vault_ledger::AppendLog;

use crate::capsule::{CheckpointCapsule, CAPSULE_SCHEMA_VERSION};
use crate::error::CheckpointError;

/// Tick monotonicity rule, per the `checkpoint.seq_enforce` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqEnforce {
    /// Each tick must be strictly greater than the last (default).
    #[default]
    Strict,
    /// Ticks may repeat but must never decrease.
    MonotonicNonstrict,
}

/// What a snapshot produced.
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    /// CID of the capsule record in the content store.
    pub capsule_cid: PayloadCid,
    /// The chain hash of the appended entry.
    pub chain_hash: ContentDigest,
    /// The capsule itself.
    pub capsule: CheckpointCapsule,
}

/// A producer that can be re-executed deterministically for audit.
///
/// Implementations must produce canonical state: integers only, no
/// wall-clock or host-identifying fields.
pub trait ReplayProducer {
    /// Reset the producer to the given seed.
    fn reset(&mut self, seed: u64);

    /// Advance to the given tick and return the canonical state there.
    /// Ticks are visited in the order the capsule chain recorded them.
    fn state_at(&mut self, tick: u64) -> Value;
}

/// Snapshots producer state into capsule chains.
pub struct CheckpointEngine {
    store: Arc<ContentStore>,
    log: Arc<AppendLog>,
    enforce: SeqEnforce,
    snapshot_locks: DashMap<StreamId, Arc<Mutex<()>>>,
}

impl CheckpointEngine {
    /// Create an engine with strict tick enforcement.
    pub fn new(store: Arc<ContentStore>, log: Arc<AppendLog>) -> Self {
        Self::with_enforcement(store, log, SeqEnforce::default())
    }

    /// Create an engine with an explicit monotonicity rule.
    pub fn with_enforcement(
        store: Arc<ContentStore>,
        log: Arc<AppendLog>,
        enforce: SeqEnforce,
    ) -> Self {
        Self {
            store,
            log,
            enforce,
            snapshot_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, stream: &StreamId) -> Arc<Mutex<()>> {
        self.snapshot_locks
            .entry(stream.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Snapshot producer state into a capsule. Blocks on the stream's
    /// snapshot lock.
    pub fn snapshot(
        &self,
        stream: &StreamId,
        tick: u64,
        producer_state: &Value,
        producer_metadata: Value,
    ) -> Result<SnapshotOutcome, CheckpointError> {
        self.snapshot_with_deadline(stream, tick, producer_state, producer_metadata, None)
    }

    /// Snapshot with a deadline on lock acquisition. On expiry before the
    /// lock is held the call fails `Timeout` with no state change; once
    /// the lock is held the operation runs to commit or rollback.
    pub fn snapshot_with_deadline(
        &self,
        stream: &StreamId,
        tick: u64,
        producer_state: &Value,
        producer_metadata: Value,
        deadline: Option<Instant>,
    ) -> Result<SnapshotOutcome, CheckpointError> {
        let lock = self.lock_for(stream);
        let _guard = match deadline {
            None => lock.lock(),
            Some(d) => lock
                .try_lock_until(d)
                .ok_or_else(|| CheckpointError::Timeout {
                    stream: stream.clone(),
                })?,
        };

        // Parent lookup: the tip's payload CID is the previous capsule's
        // CID; its record carries the last accepted tick.
        let tip = self.log.tip(stream)?;
        let (parent_capsule_cid, last_tick) = match &tip {
            Some(entry) => {
                let record = self.log.get_record(stream, entry.seq)?;
                let parent =
                    CheckpointCapsule::from_record(&record).map_err(|e| {
                        CheckpointError::ForeignTip {
                            stream: stream.clone(),
                            seq: entry.seq,
                            reason: e.to_string(),
                        }
                    })?;
                (Some(entry.payload_cid), Some(parent.tick))
            }
            None => (None, None),
        };

        if let Some(last) = last_tick {
            let ordered = match self.enforce {
                SeqEnforce::Strict => tick > last,
                SeqEnforce::MonotonicNonstrict => tick >= last,
            };
            if !ordered {
                return Err(CheckpointError::OutOfOrder {
                    stream: stream.clone(),
                    last_tick: last,
                    tick,
                });
            }
        }

        // Freeze the state first; the capsule commits to its digest.
        let state_canonical = CanonicalBytes::from_value(producer_state.clone())?;
        let state_digest = sha256_digest(&state_canonical);
        let state_payload_cid = self.store.put_canonical(&state_canonical)?;

        let capsule = CheckpointCapsule {
            schema_version: CAPSULE_SCHEMA_VERSION.to_string(),
            stream_id: stream.clone(),
            tick,
            state_digest,
            state_payload_cid,
            parent_capsule_cid,
            producer_metadata,
        };
        let capsule_record = serde_json::to_value(&capsule)
            .map_err(vault_core::CanonicalizationError::from)?;
        let capsule_canonical = CanonicalBytes::from_value(capsule_record.clone())?;
        let capsule_cid = self.store.put_canonical(&capsule_canonical)?;

        let entry = self.log.append(stream, &capsule_record, &capsule_cid)?;
        tracing::debug!(
            stream = %stream,
            tick,
            capsule_cid = %capsule_cid,
            chain_hash = %entry.hash,
            "capsule appended"
        );

        Ok(SnapshotOutcome {
            capsule_cid,
            chain_hash: entry.hash,
            capsule,
        })
    }
}
