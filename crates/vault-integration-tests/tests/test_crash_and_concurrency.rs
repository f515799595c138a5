//! Crash-safety and concurrency behavior across the persistence stack.

use std::io::Write;
use std::sync::Arc;

use serde_json::{json, Value};

use vault_anchor::{AnchorRequest, AnchorService, REQUEST_SCHEMA_VERSION};
use vault_core::{CanonicalBytes, PayloadCid, StreamId};
use vault_crypto::{ContentStore, LocalKeyProvider, PublicKeyArchive};
use vault_ledger::AppendLog;

fn sid(s: &str) -> StreamId {
    StreamId::new(s).unwrap()
}

fn stored_cid(store: &ContentStore, record: &Value) -> PayloadCid {
    let canonical = CanonicalBytes::from_value(record.clone()).unwrap();
    store.put_canonical(&canonical).unwrap()
}

/// After an induced crash mid-append, restart yields a fully committed
/// tip and the next append continues with `seq = tip.seq + 1`.
#[test]
fn crash_mid_append_recovers_to_committed_tip() {
    let dir = tempfile::tempdir().unwrap();
    let stream = sid("durable");
    let store = ContentStore::new(dir.path().join("cas"));

    let committed = {
        let log = AppendLog::new(dir.path().join("log"));
        let mut last = None;
        for n in 0..3u64 {
            let record = json!({"n": n});
            let cid = stored_cid(&store, &record);
            last = Some(log.append(&stream, &record, &cid).unwrap());
        }
        last.unwrap()
    };

    // Crash: a frame whose header was written but whose payload was cut
    // short, then nothing more.
    let path = dir.path().join("log").join("durable.vlog");
    let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    f.write_all(&(1000u32).to_le_bytes()).unwrap();
    f.write_all(&(0xdeadbeefu32).to_le_bytes()).unwrap();
    f.write_all(&[0x7b; 57]).unwrap();
    drop(f);

    let log = AppendLog::new(dir.path().join("log"));
    let tip = log.tip(&stream).unwrap().unwrap();
    assert_eq!(tip, committed, "tip must be the last fully committed entry");

    let record = json!({"n": 3});
    let cid = stored_cid(&store, &record);
    let entry = log.append(&stream, &record, &cid).unwrap();
    assert_eq!(entry.seq, tip.seq + 1);
    assert_eq!(entry.prev_hash, Some(tip.hash));
}

/// A crash that cuts the frame header itself is also recovered.
#[test]
fn crash_mid_header_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let stream = sid("durable");
    let store = ContentStore::new(dir.path().join("cas"));
    {
        let log = AppendLog::new(dir.path().join("log"));
        let record = json!({"n": 0});
        let cid = stored_cid(&store, &record);
        log.append(&stream, &record, &cid).unwrap();
    }

    let path = dir.path().join("log").join("durable.vlog");
    let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    f.write_all(&[0x11, 0x22, 0x33]).unwrap(); // 3 of 8 header bytes
    drop(f);

    let log = AppendLog::new(dir.path().join("log"));
    assert_eq!(log.len(&stream).unwrap(), 1);
    let record = json!({"n": 1});
    let cid = stored_cid(&store, &record);
    assert_eq!(log.append(&stream, &record, &cid).unwrap().seq, 1);
}

/// Two threads racing the same payload hash: exactly one receipt, one
/// DuplicateAnchor, one ledger line.
#[test]
fn racing_duplicate_anchors_collapse_to_one() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(
        AnchorService::init(
            Box::new(LocalKeyProvider::from_seed(&[1u8; 32])),
            Arc::new(AppendLog::new(dir.path().join("log"))),
            Arc::new(ContentStore::new(dir.path().join("cas"))),
            PublicKeyArchive::new(dir.path().join("keys")),
        )
        .unwrap(),
    );

    let request = AnchorRequest {
        schema_version: REQUEST_SCHEMA_VERSION.to_string(),
        artifact_kind: "InferenceReceipt.v1".to_string(),
        payload_hash_sha256: "6a".repeat(32),
        run_id: "run-X".to_string(),
        operator: "op".to_string(),
        ts: "2026-01-20T20:40:00Z".to_string(),
    };

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = service.clone();
            let request = request.clone();
            std::thread::spawn(move || service.write_anchor(&request).is_ok())
        })
        .collect();
    let outcomes: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(
        outcomes.iter().filter(|ok| **ok).count(),
        1,
        "exactly one writer wins"
    );
    let log = AppendLog::new(dir.path().join("log"));
    assert_eq!(log.len(&service.stream()).unwrap(), 1);
}

/// Appenders on distinct streams proceed in parallel while a scanner
/// reads one of them.
#[test]
fn parallel_streams_with_live_scanner() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(AppendLog::new(dir.path().join("log")).with_durability(false));
    let store = Arc::new(ContentStore::new(dir.path().join("cas")));

    let writers: Vec<_> = (0..3)
        .map(|t| {
            let log = log.clone();
            let store = store.clone();
            std::thread::spawn(move || {
                let stream = StreamId::new(&format!("lane-{t}")).unwrap();
                for i in 0..30u64 {
                    let record = json!({"lane": t, "i": i});
                    let cid = stored_cid(&store, &record);
                    log.append(&stream, &record, &cid).unwrap();
                }
            })
        })
        .collect();

    let scanner = {
        let log = log.clone();
        std::thread::spawn(move || {
            let stream = StreamId::new("lane-0").unwrap();
            for _ in 0..10 {
                let frames: Vec<_> = log
                    .scan(&stream, 0)
                    .unwrap()
                    .map(|r| r.unwrap())
                    .collect();
                for (i, f) in frames.iter().enumerate() {
                    assert_eq!(f.entry.seq, i as u64);
                }
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    scanner.join().unwrap();

    for t in 0..3 {
        let stream = StreamId::new(&format!("lane-{t}")).unwrap();
        assert_eq!(log.len(&stream).unwrap(), 30);
    }
}
