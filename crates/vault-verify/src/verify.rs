//! # Verification Walks
//!
//! Every check here recomputes from first principles: link hashes from the
//! four-field canonical object, record digests from the stored records,
//! payload digests from the stored bytes, signatures from the pre-anchor
//! canonicalization. Nothing trusts a stored hash over a recomputed one.

use subtle::ConstantTimeEq;
use thiserror::Error;

use vault_anchor::{compute_anchor_hash, pre_anchor_bytes, AnchorReceipt, RECEIPT_SCHEMA_VERSION};
use vault_checkpoint::{CheckpointCapsule, ReplayProducer};
use vault_core::{sha256_digest, CanonicalBytes, ContentDigest, PayloadCid, StreamId};
use vault_crypto::{verify_with_public_key, ContentStore, Ed25519PublicKey};
use vault_ledger::{chain, AppendLog, ChainEntry, LedgerError};

use crate::report::{EntryReport, EntryVerdict, ReceiptDefect, StreamReport};

/// Hard failures that prevent verification from running at all. Defects
/// found *in* the stream are reported, not raised.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The stream could not be opened or scanned.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The content store failed outright.
    #[error("content store error: {0}")]
    Store(#[from] vault_crypto::CryptoError),
}

/// Chain continuity as the walk sees it.
enum Predecessor {
    Genesis,
    Known(ChainEntry),
    /// The predecessor could not be decoded, so continuity is unprovable.
    Unverifiable(u64),
}

fn check_entry(
    store: &ContentStore,
    entry: &ChainEntry,
    record: &serde_json::Value,
    predecessor: &Predecessor,
) -> Vec<EntryVerdict> {
    let mut defects = Vec::new();

    // Record digest.
    match CanonicalBytes::from_value(record.clone()) {
        Ok(canonical) => {
            let recomputed = sha256_digest(&canonical);
            if !digests_equal(&recomputed, &entry.record_digest) {
                defects.push(EntryVerdict::RecordDigestMismatch {
                    expected: recomputed.to_hex(),
                    actual: entry.record_digest.to_hex(),
                });
            }
        }
        Err(e) => defects.push(EntryVerdict::RecordDigestMismatch {
            expected: format!("<uncanonicalizable: {e}>"),
            actual: entry.record_digest.to_hex(),
        }),
    }

    // Link hash.
    match chain::link(
        entry.prev_hash.as_ref(),
        &entry.record_digest,
        &entry.payload_cid,
        entry.seq,
    ) {
        Ok(recomputed) if digests_equal(&recomputed, &entry.hash) => {}
        Ok(recomputed) => defects.push(EntryVerdict::HashMismatch {
            expected: recomputed.to_hex(),
            actual: entry.hash.to_hex(),
        }),
        Err(e) => defects.push(EntryVerdict::HashMismatch {
            expected: format!("<uncomputable: {e}>"),
            actual: entry.hash.to_hex(),
        }),
    }

    // Chain adjacency.
    match predecessor {
        Predecessor::Genesis => {
            if entry.seq != 0 || entry.prev_hash.is_some() {
                defects.push(EntryVerdict::BrokenChain {
                    reason: format!(
                        "genesis entry must have seq 0 and null prev_hash, got seq {}",
                        entry.seq
                    ),
                });
            }
        }
        Predecessor::Known(prev) => {
            if let Err(defect) = chain::verify_pair(prev, entry) {
                defects.push(EntryVerdict::BrokenChain {
                    reason: defect.to_string(),
                });
            }
        }
        Predecessor::Unverifiable(seq) => {
            defects.push(EntryVerdict::BrokenChain {
                reason: format!("predecessor at seq {seq} is unverifiable"),
            });
        }
    }

    // Payload resolution and rehash.
    check_payload(store, &entry.payload_cid, &entry.record_digest, &mut defects);

    defects
}

fn check_payload(
    store: &ContentStore,
    cid: &PayloadCid,
    record_digest: &ContentDigest,
    defects: &mut Vec<EntryVerdict>,
) {
    match store.get(cid) {
        Ok(Some(bytes)) => {
            let stored = PayloadCid::from_payload(
                cid.codec().unwrap_or_default(),
                &bytes,
            );
            match stored.digest() {
                Ok(digest) if digests_equal(&digest, record_digest) => {}
                Ok(digest) => defects.push(EntryVerdict::PayloadMismatch {
                    reason: format!(
                        "payload rehashes to {} but record digest is {}",
                        digest.to_hex(),
                        record_digest.to_hex()
                    ),
                }),
                Err(e) => defects.push(EntryVerdict::PayloadMismatch {
                    reason: format!("payload digest unreadable: {e}"),
                }),
            }
        }
        Ok(None) => defects.push(EntryVerdict::MissingPayload {
            cid: cid.to_string(),
        }),
        Err(e) => defects.push(EntryVerdict::PayloadMismatch {
            reason: e.to_string(),
        }),
    }
}

fn digests_equal(a: &ContentDigest, b: &ContentDigest) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Walk a stream from genesis, recomputing every commitment.
///
/// Verification continues past failures so the report covers every
/// defect. A broken result halts writers on the stream until operator
/// reset.
pub fn verify_stream(
    log: &AppendLog,
    store: &ContentStore,
    stream: &StreamId,
) -> Result<StreamReport, VerifyError> {
    let mut entries = Vec::new();
    let mut predecessor = Predecessor::Genesis;

    for (idx, frame) in log.scan(stream, 0)?.enumerate() {
        let seq = idx as u64;
        match frame {
            Ok(frame) => {
                let defects = check_entry(store, &frame.entry, &frame.record, &predecessor);
                entries.push(EntryReport { seq, defects });
                predecessor = Predecessor::Known(frame.entry);
            }
            Err(e) => {
                entries.push(EntryReport {
                    seq,
                    defects: vec![EntryVerdict::CorruptEntry {
                        reason: e.to_string(),
                    }],
                });
                predecessor = Predecessor::Unverifiable(seq);
            }
        }
    }

    let report = StreamReport::new(stream.clone(), entries);
    if !report.is_intact() {
        tracing::warn!(
            stream = %stream,
            defects = report.defect_count(),
            "stream verification found defects"
        );
        log.mark_broken(stream, "verification found integrity defects")?;
    }
    Ok(report)
}

/// Verify a sealed receipt against a public key.
///
/// Recomputes the pre-anchor canonicalization, checks the signature, then
/// recomputes the anchor hash and compares constant-time.
pub fn verify_receipt(
    receipt: &AnchorReceipt,
    public_key: &Ed25519PublicKey,
) -> Result<(), ReceiptDefect> {
    if receipt.schema_version != RECEIPT_SCHEMA_VERSION {
        return Err(ReceiptDefect::WrongSchemaVersion(
            receipt.schema_version.clone(),
        ));
    }
    if !receipt.sealed {
        return Err(ReceiptDefect::NotSealed);
    }
    let signature = receipt
        .signature
        .as_ref()
        .ok_or(ReceiptDefect::MissingSignature)?;

    let key_fingerprint = public_key.fingerprint();
    if key_fingerprint != receipt.vault_fingerprint {
        return Err(ReceiptDefect::FingerprintMismatch {
            expected: receipt.vault_fingerprint.to_hex(),
            actual: key_fingerprint.to_hex(),
        });
    }

    let signed = pre_anchor_bytes(receipt)
        .map_err(|e| ReceiptDefect::Canonicalization(e.to_string()))?;
    verify_with_public_key(&signed, signature, public_key)
        .map_err(|e| ReceiptDefect::InvalidSignature(e.to_string()))?;

    let recomputed = compute_anchor_hash(receipt)
        .map_err(|e| ReceiptDefect::Canonicalization(e.to_string()))?;
    match ContentDigest::from_hex(&receipt.anchor_hash) {
        Ok(stored) if digests_equal(&recomputed, &stored) => Ok(()),
        _ => Err(ReceiptDefect::AnchorHashMismatch {
            expected: recomputed.to_hex(),
            actual: receipt.anchor_hash.clone(),
        }),
    }
}

/// Verify a capsule chain: everything [`verify_stream`] checks, plus
/// parent-CID linkage, tick ordering, state payload integrity, and
/// (when a producer hook is supplied and the genesis capsule declares a
/// seed) deterministic re-execution.
pub fn verify_capsule_chain(
    log: &AppendLog,
    store: &ContentStore,
    stream: &StreamId,
    mut producer: Option<&mut dyn ReplayProducer>,
) -> Result<StreamReport, VerifyError> {
    let mut entries = Vec::new();
    let mut predecessor = Predecessor::Genesis;
    let mut prev_capsule: Option<(PayloadCid, u64)> = None;
    let mut replay_armed = false;

    for (idx, frame) in log.scan(stream, 0)?.enumerate() {
        let seq = idx as u64;
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                entries.push(EntryReport {
                    seq,
                    defects: vec![EntryVerdict::CorruptEntry {
                        reason: e.to_string(),
                    }],
                });
                predecessor = Predecessor::Unverifiable(seq);
                prev_capsule = None;
                continue;
            }
        };

        let mut defects = check_entry(store, &frame.entry, &frame.record, &predecessor);

        match CheckpointCapsule::from_record(&frame.record) {
            Ok(capsule) => {
                // Parent linkage.
                match (&capsule.parent_capsule_cid, &prev_capsule) {
                    (None, None) => {}
                    (Some(parent), Some((expected_cid, _))) if parent == expected_cid => {}
                    (parent, _) => defects.push(EntryVerdict::CapsuleDefect {
                        reason: format!(
                            "parent_capsule_cid {:?} does not match predecessor capsule",
                            parent.as_ref().map(|p| p.to_string())
                        ),
                    }),
                }

                // Tick ordering.
                if let Some((_, last_tick)) = &prev_capsule {
                    if capsule.tick < *last_tick {
                        defects.push(EntryVerdict::CapsuleDefect {
                            reason: format!(
                                "tick {} decreases after {last_tick}",
                                capsule.tick
                            ),
                        });
                    }
                }

                // State payload integrity.
                match store.get(&capsule.state_payload_cid) {
                    Ok(Some(bytes)) => {
                        match CanonicalBytes::parse_strict(&String::from_utf8_lossy(&bytes)) {
                            Ok(canonical) => {
                                let digest = sha256_digest(&canonical);
                                if !digests_equal(&digest, &capsule.state_digest) {
                                    defects.push(EntryVerdict::CapsuleDefect {
                                        reason: format!(
                                            "state payload rehashes to {} but capsule declares {}",
                                            digest.to_hex(),
                                            capsule.state_digest.to_hex()
                                        ),
                                    });
                                }
                            }
                            Err(e) => defects.push(EntryVerdict::CapsuleDefect {
                                reason: format!("state payload is not canonical: {e}"),
                            }),
                        }
                    }
                    Ok(None) => defects.push(EntryVerdict::CapsuleDefect {
                        reason: format!(
                            "state payload {} missing from content store",
                            capsule.state_payload_cid
                        ),
                    }),
                    Err(e) => defects.push(EntryVerdict::CapsuleDefect {
                        reason: format!("state payload unreadable: {e}"),
                    }),
                }

                // Deterministic re-execution.
                if let Some(producer) = producer.as_deref_mut() {
                    if seq == 0 {
                        if let Some(seed) = capsule.declared_seed() {
                            producer.reset(seed);
                            replay_armed = true;
                        }
                    }
                    if replay_armed {
                        let replayed = producer.state_at(capsule.tick);
                        match CanonicalBytes::from_value(replayed) {
                            Ok(canonical) => {
                                let digest = sha256_digest(&canonical);
                                if !digests_equal(&digest, &capsule.state_digest) {
                                    defects.push(EntryVerdict::CapsuleDefect {
                                        reason: format!(
                                            "replay diverges at tick {}: {} != {}",
                                            capsule.tick,
                                            digest.to_hex(),
                                            capsule.state_digest.to_hex()
                                        ),
                                    });
                                }
                            }
                            Err(e) => defects.push(EntryVerdict::CapsuleDefect {
                                reason: format!("replayed state is not canonical: {e}"),
                            }),
                        }
                    }
                }

                prev_capsule = Some((frame.entry.payload_cid, capsule.tick));
            }
            Err(e) => {
                defects.push(EntryVerdict::CapsuleDefect {
                    reason: format!("record is not a capsule: {e}"),
                });
                prev_capsule = None;
            }
        }

        entries.push(EntryReport { seq, defects });
        predecessor = Predecessor::Known(frame.entry);
    }

    let report = StreamReport::new(stream.clone(), entries);
    if !report.is_intact() {
        tracing::warn!(
            stream = %stream,
            defects = report.defect_count(),
            "capsule chain verification found defects"
        );
        log.mark_broken(stream, "capsule verification found integrity defects")?;
    }
    Ok(report)
}
