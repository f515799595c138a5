//! # Anchor Service
//!
//! Owns the vault key and the fingerprint-bound anchor stream. All anchor
//! operations serialize on one lock, which also guards the dedup index:
//! a dedup check and its append are a single critical section, so two
//! racing writes of the same payload hash can never both land.
//!
//! ## Key lifecycle
//!
//! - `init` loads the key, registers the public half in the archive, and
//!   opens (or resumes) the stream named after the fingerprint, replaying
//!   it to rebuild the dedup index.
//! - `teardown` drops the provider; key material zeroizes on drop.
//!   Subsequent writes fail `KeyUnavailable`.
//! - `rotate` is teardown plus init with a new key: a new stream opens,
//!   and old streams stay verifiable through the archive.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use vault_core::{AnchorId, StreamId, Timestamp};
use vault_crypto::{ContentStore, KeyProvider, PublicKeyArchive, VaultFingerprint};
use vault_ledger::AppendLog;

use crate::error::AnchorError;
use crate::receipt::{
    compute_anchor_hash, pre_anchor_bytes, AnchorLedgerLine, AnchorReceipt, AnchorRequest,
    RECEIPT_SCHEMA_VERSION,
};

struct AnchorState {
    provider: Option<Box<dyn KeyProvider>>,
    fingerprint: VaultFingerprint,
    stream: StreamId,
    /// Payload hashes already anchored in the active stream.
    anchored: HashSet<String>,
}

/// The anchor service: one signing identity, one stream, one lock.
pub struct AnchorService {
    log: Arc<AppendLog>,
    store: Arc<ContentStore>,
    archive: PublicKeyArchive,
    state: Mutex<AnchorState>,
}

impl AnchorService {
    /// Initialize the service with a loaded key.
    ///
    /// Opens (or resumes) the anchor stream bound to the key's
    /// fingerprint and rebuilds the dedup index from its ledger lines.
    pub fn init(
        provider: Box<dyn KeyProvider>,
        log: Arc<AppendLog>,
        store: Arc<ContentStore>,
        archive: PublicKeyArchive,
    ) -> Result<Self, AnchorError> {
        let state = Self::open_identity(provider, &log, &archive)?;
        tracing::info!(
            fingerprint = %state.fingerprint,
            stream = %state.stream,
            anchored = state.anchored.len(),
            "anchor service initialized"
        );
        Ok(Self {
            log,
            store,
            archive,
            state: Mutex::new(state),
        })
    }

    fn open_identity(
        provider: Box<dyn KeyProvider>,
        log: &AppendLog,
        archive: &PublicKeyArchive,
    ) -> Result<AnchorState, AnchorError> {
        let public_key = provider.public_key()?;
        let fingerprint = archive.register(&public_key)?;
        let stream = StreamId::new(&format!("anchors-{}", fingerprint.short()))
            .expect("fingerprint-derived stream names are always valid");
        log.open(&stream)?;

        let mut anchored = HashSet::new();
        for frame in log.scan(&stream, 0)? {
            let frame = frame?;
            if let Ok(line) = AnchorLedgerLine::from_record(&frame.record) {
                anchored.insert(line.payload_hash);
            }
        }

        Ok(AnchorState {
            provider: Some(provider),
            fingerprint,
            stream,
            anchored,
        })
    }

    /// The active signing fingerprint.
    pub fn fingerprint(&self) -> VaultFingerprint {
        self.state.lock().fingerprint
    }

    /// The active anchor stream.
    pub fn stream(&self) -> StreamId {
        self.state.lock().stream.clone()
    }

    /// The public-key archive backing long-term verification.
    pub fn archive(&self) -> &PublicKeyArchive {
        &self.archive
    }

    /// Drop the vault key. Key material zeroizes on drop; subsequent
    /// writes fail `KeyUnavailable` until a new key is installed.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        state.provider = None;
        tracing::info!(fingerprint = %state.fingerprint, "vault key torn down");
    }

    /// Teardown plus init with a new key: opens the new fingerprint-bound
    /// stream and rebuilds its dedup index.
    pub fn rotate(&self, provider: Box<dyn KeyProvider>) -> Result<(), AnchorError> {
        let fresh = Self::open_identity(provider, &self.log, &self.archive)?;
        let mut state = self.state.lock();
        tracing::info!(
            old = %state.fingerprint,
            new = %fresh.fingerprint,
            "vault key rotated"
        );
        *state = fresh;
        Ok(())
    }

    /// Execute the write-anchor protocol. Blocks on the anchor lock.
    pub fn write_anchor(&self, request: &AnchorRequest) -> Result<AnchorReceipt, AnchorError> {
        self.write_anchor_with_deadline(request, None)
    }

    /// Write an anchor with a deadline on lock acquisition. On expiry
    /// before the lock is held the call fails `Timeout` with no state
    /// change; once the lock is held the operation runs to commit.
    pub fn write_anchor_with_deadline(
        &self,
        request: &AnchorRequest,
        deadline: Option<Instant>,
    ) -> Result<AnchorReceipt, AnchorError> {
        // 1. Structural validation. Before any lock, no state change.
        request.validate()?;

        let mut state = match deadline {
            None => self.state.lock(),
            Some(d) => self.state.try_lock_until(d).ok_or(AnchorError::Timeout)?,
        };

        // 2. Dedup under the same lock the append holds.
        if state.anchored.contains(&request.payload_hash_sha256) {
            return Err(AnchorError::DuplicateAnchor(
                request.payload_hash_sha256.clone(),
            ));
        }

        let provider = state
            .provider
            .as_ref()
            .ok_or_else(|| AnchorError::KeyUnavailable("vault key is torn down".to_string()))?;

        // 3–4. Mint the id and build the pre-anchor receipt.
        let mut receipt = AnchorReceipt {
            schema_version: RECEIPT_SCHEMA_VERSION.to_string(),
            artifact_kind: request.artifact_kind.clone(),
            payload_hash: request.payload_hash_sha256.clone(),
            vault_fingerprint: state.fingerprint,
            anchor_id: AnchorId::mint(),
            anchor_hash: String::new(),
            ts: Timestamp::now(),
            sealed: true,
            signature: None,
        };

        // 5. Sign the pre-anchor bytes. Never retried: a failed append
        // below surfaces as an error rather than a second signature.
        let signed_bytes = pre_anchor_bytes(&receipt)?;
        receipt.signature = Some(provider.sign(&signed_bytes)?);

        // 6. Seal: hash the receipt with the signature present.
        receipt.anchor_hash = compute_anchor_hash(&receipt)?.to_hex();

        // 7. Project and persist.
        let line = AnchorLedgerLine::from_receipt(&receipt)?;
        let record = serde_json::to_value(&line)
            .map_err(vault_core::CanonicalizationError::from)?;
        let canonical = vault_core::CanonicalBytes::from_value(record.clone())?;
        let payload_cid = self.store.put_canonical(&canonical)?;
        let entry = self.log.append(&state.stream, &record, &payload_cid)?;

        state.anchored.insert(request.payload_hash_sha256.clone());
        tracing::info!(
            anchor_id = %receipt.anchor_id,
            payload_hash = %receipt.payload_hash,
            seq = entry.seq,
            "anchor sealed"
        );

        // 8. Return the sealed receipt.
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::REQUEST_SCHEMA_VERSION;
    use vault_crypto::{verify_with_public_key, LocalKeyProvider};

    fn request(hash_byte: &str) -> AnchorRequest {
        AnchorRequest {
            schema_version: REQUEST_SCHEMA_VERSION.to_string(),
            artifact_kind: "InferenceReceipt.v1".to_string(),
            payload_hash_sha256: hash_byte.repeat(32),
            run_id: "run-X".to_string(),
            operator: "op".to_string(),
            ts: "2026-01-20T20:40:00Z".to_string(),
        }
    }

    fn service_in(dir: &std::path::Path, seed: u8) -> AnchorService {
        AnchorService::init(
            Box::new(LocalKeyProvider::from_seed(&[seed; 32])),
            Arc::new(AppendLog::new(dir.join("log"))),
            Arc::new(ContentStore::new(dir.join("cas"))),
            PublicKeyArchive::new(dir.join("keys")),
        )
        .unwrap()
    }

    #[test]
    fn happy_path_receipt_invariants() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);
        let req = request("6a");
        let receipt = service.write_anchor(&req).unwrap();

        assert_eq!(receipt.schema_version, RECEIPT_SCHEMA_VERSION);
        assert_eq!(receipt.payload_hash, req.payload_hash_sha256);
        assert!(receipt.sealed);
        assert_eq!(receipt.vault_fingerprint, service.fingerprint());

        // The signature verifies over the pre-anchor bytes.
        let public_key = service
            .archive()
            .lookup(&receipt.vault_fingerprint)
            .unwrap()
            .unwrap();
        let signed = pre_anchor_bytes(&receipt).unwrap();
        verify_with_public_key(&signed, receipt.signature.as_ref().unwrap(), &public_key)
            .expect("receipt signature must verify");

        // The anchor hash recomputes.
        assert_eq!(
            receipt.anchor_hash,
            compute_anchor_hash(&receipt).unwrap().to_hex()
        );
    }

    #[test]
    fn duplicate_anchor_rejected_and_ledger_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);
        let req = request("6a");

        service.write_anchor(&req).unwrap();
        let err = service.write_anchor(&req).unwrap_err();
        assert!(matches!(err, AnchorError::DuplicateAnchor(_)));

        assert_eq!(service.log.len(&service.stream()).unwrap(), 1);
    }

    #[test]
    fn distinct_hashes_both_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);
        service.write_anchor(&request("aa")).unwrap();
        service.write_anchor(&request("bb")).unwrap();
        assert_eq!(service.log.len(&service.stream()).unwrap(), 2);
    }

    #[test]
    fn dedup_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let service = service_in(dir.path(), 1);
            service.write_anchor(&request("6a")).unwrap();
        }
        // Same key, fresh process: the stream replays into the dedup index.
        let service = service_in(dir.path(), 1);
        assert!(matches!(
            service.write_anchor(&request("6a")).unwrap_err(),
            AnchorError::DuplicateAnchor(_)
        ));
    }

    #[test]
    fn teardown_makes_key_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);
        service.teardown();
        assert!(matches!(
            service.write_anchor(&request("6a")).unwrap_err(),
            AnchorError::KeyUnavailable(_)
        ));
    }

    #[test]
    fn rotation_opens_a_new_stream_and_resets_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);
        let old_stream = service.stream();
        let old_fingerprint = service.fingerprint();
        let old_receipt = service.write_anchor(&request("6a")).unwrap();

        service
            .rotate(Box::new(LocalKeyProvider::from_seed(&[2u8; 32])))
            .unwrap();
        assert_ne!(service.fingerprint(), old_fingerprint);
        assert_ne!(service.stream(), old_stream);

        // The same payload hash anchors again under the new identity.
        let new_receipt = service.write_anchor(&request("6a")).unwrap();
        assert_ne!(new_receipt.vault_fingerprint, old_receipt.vault_fingerprint);

        // Old receipts stay verifiable through the archive.
        let old_key = service.archive().lookup(&old_fingerprint).unwrap().unwrap();
        let signed = pre_anchor_bytes(&old_receipt).unwrap();
        verify_with_public_key(&signed, old_receipt.signature.as_ref().unwrap(), &old_key)
            .expect("rotated-out receipts must still verify");
    }

    #[test]
    fn validation_failures_change_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);

        let mut bad = request("6a");
        bad.ts = "not-a-time".to_string();
        assert!(service.write_anchor(&bad).is_err());
        assert!(service.log.is_empty(&service.stream()).unwrap());
    }

    #[test]
    fn out_of_order_timestamps_still_anchor() {
        // Clock skew: ts is caller data, not an ordering key.
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);

        let mut late = request("aa");
        late.ts = "2026-06-01T00:00:00Z".to_string();
        let mut early = request("bb");
        early.ts = "2020-01-01T00:00:00Z".to_string();

        service.write_anchor(&late).unwrap();
        let receipt = service.write_anchor(&early).unwrap();
        assert!(receipt.sealed);
    }

    #[test]
    fn deadline_expiry_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);

        let guard = service.state.lock();
        let deadline = Instant::now() + std::time::Duration::from_millis(20);
        let err = service
            .write_anchor_with_deadline(&request("6a"), Some(deadline))
            .unwrap_err();
        assert!(matches!(err, AnchorError::Timeout));
        drop(guard);

        service.write_anchor(&request("6a")).unwrap();
    }

    #[test]
    fn ledger_line_matches_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), 1);
        let receipt = service.write_anchor(&request("6a")).unwrap();

        let record = service.log.get_record(&service.stream(), 0).unwrap();
        let line = AnchorLedgerLine::from_record(&record).unwrap();
        assert_eq!(line.anchor_id, receipt.anchor_id);
        assert_eq!(line.payload_hash, receipt.payload_hash);
        assert_eq!(line.anchor_hash, receipt.anchor_hash);
        assert_eq!(&line.signature, receipt.signature.as_ref().unwrap());
    }
}
