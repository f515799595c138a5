//! # Append-Only Log
//!
//! One framed log file per stream under a common root directory:
//!
//! ```text
//! {root}/{stream_id}.vlog
//! frame := u32-le payload_len | u32-le crc32(payload) | payload
//! payload := canonical JSON of LogFrame { entry, record }
//! ```
//!
//! ## Crash semantics
//!
//! A frame is the atomic commit unit. On open, the tail of the file is
//! scanned; a partially written trailing frame is truncated so that
//! `tip()` is always a fully committed entry and the next `append`
//! continues from it. A *complete* frame that fails its checksum is not a
//! torn write; it is corruption. The stream is then marked BROKEN: reads
//! still work (and report the corrupt entry), writes fail `StreamLocked`
//! until an operator calls `reset()`.
//!
//! ## Concurrency
//!
//! Appends within a stream are serialized by a per-stream writer lock;
//! streams are independent. Readers open their own file handles and take
//! only a momentary metadata read lock, so they never wait on writer I/O.
//! Durable streams fsync before the append acknowledgement returns.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use vault_core::{sha256_digest, CanonicalBytes, PayloadCid, StreamId, Timestamp};

use crate::chain;
use crate::entry::{ChainEntry, LogFrame};
use crate::error::LedgerError;
use crate::schema::SchemaRegistry;

const FRAME_HEADER_LEN: usize = 8;
/// Upper bound on a single frame payload. A length prefix beyond this is
/// garbage from a torn header write.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Stream state
// ---------------------------------------------------------------------------

struct StreamMeta {
    /// Byte offset of each committed frame, indexed by seq.
    offsets: Vec<u64>,
    /// End of the committed region; appends write here.
    end: u64,
    /// The last fully committed, parseable entry.
    tip: Option<ChainEntry>,
    /// Set when an integrity failure halted the stream.
    broken: Option<String>,
}

struct StreamWriter {
    file: File,
}

struct StreamHandle {
    path: PathBuf,
    durable: bool,
    writer: Mutex<StreamWriter>,
    meta: RwLock<StreamMeta>,
}

/// Result of scanning a stream file from byte zero.
struct Recovery {
    offsets: Vec<u64>,
    end: u64,
    tip: Option<ChainEntry>,
    broken: Option<String>,
    truncated: bool,
}

/// Scan the file, index complete frames, and locate the committed end.
///
/// Torn tails (incomplete header, oversized length prefix, payload past
/// EOF) end the committed region. Complete frames with bad checksums or
/// unparseable payloads are indexed (so scans can report them) but mark
/// the stream broken.
fn scan_file(data: &[u8], id: &StreamId) -> Recovery {
    let mut offsets = Vec::new();
    let mut end = 0usize;
    let mut tip = None;
    let mut broken = None;
    let mut pos = 0usize;
    let mut truncated = false;

    while pos < data.len() {
        if data.len() - pos < FRAME_HEADER_LEN {
            truncated = true;
            break;
        }
        let len = u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let crc = u32::from_le_bytes([
            data[pos + 4],
            data[pos + 5],
            data[pos + 6],
            data[pos + 7],
        ]);
        if len > MAX_FRAME_LEN || data.len() - pos - FRAME_HEADER_LEN < len {
            truncated = true;
            break;
        }
        let payload = &data[pos + FRAME_HEADER_LEN..pos + FRAME_HEADER_LEN + len];
        let seq = offsets.len() as u64;
        if crc32fast::hash(payload) != crc {
            broken.get_or_insert_with(|| format!("crc mismatch at seq {seq}"));
        } else {
            match serde_json::from_slice::<LogFrame>(payload) {
                Ok(frame) if frame.entry.seq == seq => tip = Some(frame.entry),
                Ok(frame) => {
                    broken.get_or_insert_with(|| {
                        format!("frame at seq {seq} carries seq {}", frame.entry.seq)
                    });
                }
                Err(e) => {
                    broken.get_or_insert_with(|| format!("undecodable frame at seq {seq}: {e}"));
                }
            }
        }
        offsets.push(pos as u64);
        pos += FRAME_HEADER_LEN + len;
        end = pos;
    }

    if let Some(reason) = &broken {
        tracing::warn!(stream = %id, reason = %reason, "stream halted on open");
    }

    Recovery {
        offsets,
        end: end as u64,
        tip,
        broken,
        truncated,
    }
}

impl StreamHandle {
    fn open(root: &Path, id: &StreamId, durable: bool) -> Result<Self, LedgerError> {
        fs::create_dir_all(root)?;
        let path = root.join(format!("{id}.vlog"));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let recovery = scan_file(&data, id);
        if recovery.truncated {
            tracing::warn!(
                stream = %id,
                committed = recovery.end,
                total = data.len(),
                "truncating torn trailing frame"
            );
            file.set_len(recovery.end as u64)?;
            file.sync_data()?;
        }

        Ok(Self {
            path,
            durable,
            writer: Mutex::new(StreamWriter { file }),
            meta: RwLock::new(StreamMeta {
                offsets: recovery.offsets,
                end: recovery.end as u64,
                tip: recovery.tip,
                broken: recovery.broken,
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// AppendLog
// ---------------------------------------------------------------------------

/// The durable, ordered, append-only record sink.
///
/// Holds a registry of open streams keyed by [`StreamId`]; streams open
/// lazily on first use and can be opened or closed explicitly.
pub struct AppendLog {
    root: PathBuf,
    durable: bool,
    registry: Option<Arc<SchemaRegistry>>,
    streams: DashMap<StreamId, Arc<StreamHandle>>,
}

impl AppendLog {
    /// Create a log rooted at the given directory. Streams are durable
    /// (fsync before acknowledgement) by default.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durable: true,
            registry: None,
            streams: DashMap::new(),
        }
    }

    /// Disable or enable fsync-before-ack for streams opened afterwards.
    pub fn with_durability(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Attach a schema registry; appended records are validated against it.
    pub fn with_schema_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The log's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn handle(&self, id: &StreamId) -> Result<Arc<StreamHandle>, LedgerError> {
        if let Some(h) = self.streams.get(id) {
            return Ok(h.clone());
        }
        let created = Arc::new(StreamHandle::open(&self.root, id, self.durable)?);
        let entry = self.streams.entry(id.clone()).or_insert(created);
        Ok(entry.clone())
    }

    /// Open a stream explicitly (recovery runs here).
    pub fn open(&self, id: &StreamId) -> Result<(), LedgerError> {
        self.handle(id).map(|_| ())
    }

    /// Close a stream, draining any in-flight append first.
    pub fn close(&self, id: &StreamId) {
        if let Some((_, handle)) = self.streams.remove(id) {
            let _drain = handle.writer.lock();
            tracing::debug!(stream = %id, "stream closed");
        }
    }

    /// Append a record to a stream. Blocks until the writer lock is held.
    pub fn append(
        &self,
        id: &StreamId,
        record: &Value,
        payload_cid: &PayloadCid,
    ) -> Result<ChainEntry, LedgerError> {
        self.append_with_deadline(id, record, payload_cid, None)
    }

    /// Append with a deadline on write-lock acquisition.
    ///
    /// If the deadline expires before the lock is held the call fails
    /// `Timeout` with no state change. Once the lock is held, the
    /// operation runs to commit.
    pub fn append_with_deadline(
        &self,
        id: &StreamId,
        record: &Value,
        payload_cid: &PayloadCid,
        deadline: Option<Instant>,
    ) -> Result<ChainEntry, LedgerError> {
        let handle = self.handle(id)?;
        let mut writer = match deadline {
            None => handle.writer.lock(),
            Some(d) => handle
                .writer
                .try_lock_until(d)
                .ok_or_else(|| LedgerError::Timeout { stream: id.clone() })?,
        };

        let (seq, prev_hash, write_at) = {
            let meta = handle.meta.read();
            if let Some(reason) = &meta.broken {
                return Err(LedgerError::StreamLocked {
                    stream: id.clone(),
                    reason: format!("stream halted pending operator reset: {reason}"),
                });
            }
            match &meta.tip {
                Some(t) => (t.seq + 1, Some(t.hash), meta.end),
                None => (0, None, meta.end),
            }
        };

        if let Some(registry) = &self.registry {
            registry.validate(record)?;
        }

        let canonical = CanonicalBytes::from_value(record.clone())?;
        let record_digest = sha256_digest(&canonical);
        if payload_cid.digest()? != record_digest {
            return Err(LedgerError::PayloadMismatch {
                stream: id.clone(),
                cid_digest: payload_cid.digest()?.to_hex(),
                record_digest: record_digest.to_hex(),
            });
        }

        let hash = chain::link(prev_hash.as_ref(), &record_digest, payload_cid, seq)?;
        let entry = ChainEntry {
            prev_hash,
            hash,
            record_digest,
            payload_cid: *payload_cid,
            seq,
            ts_ingested: Timestamp::now(),
        };
        let frame = LogFrame {
            entry: entry.clone(),
            record: record.clone(),
        };
        let payload = CanonicalBytes::new(&frame)?;

        let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(payload.as_bytes()).to_le_bytes());
        buf.extend_from_slice(payload.as_bytes());

        writer.file.seek(SeekFrom::Start(write_at))?;
        writer.file.write_all(&buf)?;
        writer.file.flush()?;
        if handle.durable {
            writer.file.sync_data()?;
        }

        {
            let mut meta = handle.meta.write();
            meta.offsets.push(write_at);
            meta.end = write_at + buf.len() as u64;
            meta.tip = Some(entry.clone());
        }
        tracing::debug!(stream = %id, seq, hash = %entry.hash, "entry appended");
        Ok(entry)
    }

    /// The most recently committed entry, or `None` for an empty stream.
    pub fn tip(&self, id: &StreamId) -> Result<Option<ChainEntry>, LedgerError> {
        Ok(self.handle(id)?.meta.read().tip.clone())
    }

    /// Number of committed entries in a stream.
    pub fn len(&self, id: &StreamId) -> Result<u64, LedgerError> {
        Ok(self.handle(id)?.meta.read().offsets.len() as u64)
    }

    /// Whether a stream has no committed entries.
    pub fn is_empty(&self, id: &StreamId) -> Result<bool, LedgerError> {
        Ok(self.len(id)? == 0)
    }

    /// The halt reason if the stream is marked BROKEN.
    pub fn broken_reason(&self, id: &StreamId) -> Result<Option<String>, LedgerError> {
        Ok(self.handle(id)?.meta.read().broken.clone())
    }

    /// Mark a stream BROKEN. Subsequent appends fail `StreamLocked` until
    /// [`reset()`](AppendLog::reset). Used when verification finds an
    /// integrity defect.
    pub fn mark_broken(&self, id: &StreamId, reason: &str) -> Result<(), LedgerError> {
        let handle = self.handle(id)?;
        handle
            .meta
            .write()
            .broken
            .get_or_insert_with(|| reason.to_string());
        tracing::warn!(stream = %id, reason, "stream marked broken");
        Ok(())
    }

    /// Operator acknowledgement: rescan the stream file and clear the
    /// BROKEN mark if (and only if) the file now scans clean.
    pub fn reset(&self, id: &StreamId) -> Result<(), LedgerError> {
        let handle = self.handle(id)?;
        let _writer = handle.writer.lock();
        let data = fs::read(&handle.path)?;
        let recovery = scan_file(&data, id);
        if let Some(reason) = &recovery.broken {
            return Err(LedgerError::StreamLocked {
                stream: id.clone(),
                reason: format!("reset refused, stream still corrupt: {reason}"),
            });
        }
        let mut meta = handle.meta.write();
        meta.offsets = recovery.offsets;
        meta.end = recovery.end as u64;
        meta.tip = recovery.tip;
        meta.broken = None;
        tracing::info!(stream = %id, "stream reset by operator");
        Ok(())
    }

    /// Lazily iterate frames starting at `from_seq`.
    ///
    /// The iterator holds its own file handle and a snapshot of the
    /// committed offsets; it never blocks the writer and is restartable
    /// from any sequence number.
    pub fn scan(&self, id: &StreamId, from_seq: u64) -> Result<ScanIter, LedgerError> {
        let handle = self.handle(id)?;
        let offsets: Vec<u64> = {
            let meta = handle.meta.read();
            meta.offsets
                .iter()
                .skip(from_seq as usize)
                .copied()
                .collect()
        };
        let file = File::open(&handle.path)?;
        Ok(ScanIter {
            stream: id.clone(),
            file,
            offsets,
            base_seq: from_seq,
            idx: 0,
        })
    }

    /// Fetch the record stored at a sequence number.
    pub fn get_record(&self, id: &StreamId, seq: u64) -> Result<Value, LedgerError> {
        let handle = self.handle(id)?;
        let offset = {
            let meta = handle.meta.read();
            *meta
                .offsets
                .get(seq as usize)
                .ok_or_else(|| LedgerError::NoSuchEntry {
                    stream: id.clone(),
                    seq,
                })?
        };
        let mut file = File::open(&handle.path)?;
        let frame = read_frame_at(&mut file, offset, id, seq)?;
        Ok(frame.record)
    }
}

/// Read and decode one frame at a known offset.
fn read_frame_at(
    file: &mut File,
    offset: u64,
    stream: &StreamId,
    seq: u64,
) -> Result<LogFrame, LedgerError> {
    let corrupt = |reason: String| LedgerError::CorruptEntry {
        stream: stream.clone(),
        seq,
        reason,
    };

    file.seek(SeekFrom::Start(offset))?;
    let mut header = [0u8; FRAME_HEADER_LEN];
    file.read_exact(&mut header)?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if len > MAX_FRAME_LEN {
        return Err(corrupt(format!("frame length {len} exceeds bound")));
    }
    let mut payload = vec![0u8; len];
    file.read_exact(&mut payload)?;
    if crc32fast::hash(&payload) != crc {
        return Err(corrupt("checksum mismatch".to_string()));
    }
    let frame: LogFrame =
        serde_json::from_slice(&payload).map_err(|e| corrupt(format!("undecodable frame: {e}")))?;
    if frame.entry.seq != seq {
        return Err(corrupt(format!("frame carries seq {}", frame.entry.seq)));
    }
    Ok(frame)
}

/// Lazy frame iterator over a committed-offset snapshot.
pub struct ScanIter {
    stream: StreamId,
    file: File,
    offsets: Vec<u64>,
    base_seq: u64,
    idx: usize,
}

impl Iterator for ScanIter {
    type Item = Result<LogFrame, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = *self.offsets.get(self.idx)?;
        let seq = self.base_seq + self.idx as u64;
        self.idx += 1;
        Some(read_frame_at(&mut self.file, offset, &self.stream, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vault_core::CidCodec;

    fn sid(s: &str) -> StreamId {
        StreamId::new(s).unwrap()
    }

    fn cid_for(record: &Value) -> PayloadCid {
        let canonical = CanonicalBytes::from_value(record.clone()).unwrap();
        PayloadCid::from_canonical(CidCodec::Raw, &canonical)
    }

    fn append_n(log: &AppendLog, id: &StreamId, n: u64) -> Vec<ChainEntry> {
        (0..n)
            .map(|i| {
                let record = json!({"n": i});
                log.append(id, &record, &cid_for(&record)).unwrap()
            })
            .collect()
    }

    #[test]
    fn genesis_then_two_appends_chain_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        let id = sid("str-1");
        let entries = append_n(&log, &id, 3);

        assert_eq!(entries[0].seq, 0);
        assert_eq!(entries[0].prev_hash, None);
        assert_eq!(entries[1].seq, 1);
        assert_eq!(entries[1].prev_hash, Some(entries[0].hash));
        assert_eq!(entries[2].prev_hash, Some(entries[1].hash));
        assert_eq!(log.tip(&id).unwrap().unwrap(), entries[2]);
    }

    #[test]
    fn tip_of_empty_stream_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        assert!(log.tip(&sid("empty")).unwrap().is_none());
        assert!(log.is_empty(&sid("empty")).unwrap());
    }

    #[test]
    fn scan_from_zero_and_from_middle() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        let id = sid("scan-me");
        let entries = append_n(&log, &id, 5);

        let all: Vec<LogFrame> = log.scan(&id, 0).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].entry, entries[0]);
        assert_eq!(all[0].record, json!({"n": 0}));

        let rest: Vec<LogFrame> = log.scan(&id, 3).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].entry.seq, 3);
    }

    #[test]
    fn get_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        let id = sid("records");
        append_n(&log, &id, 3);
        assert_eq!(log.get_record(&id, 1).unwrap(), json!({"n": 1}));
        assert!(matches!(
            log.get_record(&id, 9).unwrap_err(),
            LedgerError::NoSuchEntry { seq: 9, .. }
        ));
    }

    #[test]
    fn append_continues_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = sid("reopen");
        let tip = {
            let log = AppendLog::new(dir.path());
            append_n(&log, &id, 2);
            log.tip(&id).unwrap().unwrap()
        };

        let log = AppendLog::new(dir.path());
        assert_eq!(log.tip(&id).unwrap().unwrap(), tip);
        let record = json!({"n": 2});
        let entry = log.append(&id, &record, &cid_for(&record)).unwrap();
        assert_eq!(entry.seq, 2);
        assert_eq!(entry.prev_hash, Some(tip.hash));
    }

    #[test]
    fn torn_trailing_frame_is_truncated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let id = sid("torn");
        let second = {
            let log = AppendLog::new(dir.path());
            append_n(&log, &id, 2)[1].clone()
        };

        // Simulate a crash mid-append: a complete header promising more
        // payload than was written.
        let path = dir.path().join("torn.vlog");
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(&(400u32).to_le_bytes()).unwrap();
        f.write_all(&(0u32).to_le_bytes()).unwrap();
        f.write_all(b"partial frame body").unwrap();
        drop(f);

        let log = AppendLog::new(dir.path());
        assert_eq!(log.tip(&id).unwrap().unwrap(), second);
        assert!(log.broken_reason(&id).unwrap().is_none());

        let record = json!({"n": 2});
        let entry = log.append(&id, &record, &cid_for(&record)).unwrap();
        assert_eq!(entry.seq, 2);
        assert_eq!(entry.prev_hash, Some(second.hash));
    }

    #[test]
    fn corrupt_middle_frame_halts_writes_but_not_reads() {
        let dir = tempfile::tempdir().unwrap();
        let id = sid("bitrot");
        {
            let log = AppendLog::new(dir.path());
            append_n(&log, &id, 3);
        }

        // Flip one byte inside the first frame's payload.
        let path = dir.path().join("bitrot.vlog");
        let mut data = fs::read(&path).unwrap();
        data[20] ^= 0xff;
        fs::write(&path, &data).unwrap();

        let log = AppendLog::new(dir.path());
        let reason = log.broken_reason(&id).unwrap().expect("stream should be broken");
        assert!(reason.contains("seq 0"), "got: {reason}");

        // Writes are rejected.
        let record = json!({"n": 3});
        assert!(matches!(
            log.append(&id, &record, &cid_for(&record)).unwrap_err(),
            LedgerError::StreamLocked { .. }
        ));

        // Reads report the corrupt entry and continue past it.
        let results: Vec<Result<LogFrame, LedgerError>> = log.scan(&id, 0).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(
            results[0],
            Err(LedgerError::CorruptEntry { seq: 0, .. })
        ));
        assert!(results[1].is_ok());
        assert!(results[2].is_ok());

        // Reset refuses while the corruption persists.
        assert!(log.reset(&id).is_err());
    }

    #[test]
    fn mark_broken_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        let id = sid("halted");
        append_n(&log, &id, 1);

        log.mark_broken(&id, "operator drill").unwrap();
        let record = json!({"n": 1});
        assert!(matches!(
            log.append(&id, &record, &cid_for(&record)).unwrap_err(),
            LedgerError::StreamLocked { .. }
        ));

        // File on disk is intact, so reset clears the halt.
        log.reset(&id).unwrap();
        assert!(log.broken_reason(&id).unwrap().is_none());
        log.append(&id, &record, &cid_for(&record)).unwrap();
    }

    #[test]
    fn payload_cid_must_address_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        let id = sid("mismatch");
        let record = json!({"n": 0});
        let wrong_cid = cid_for(&json!({"n": 999}));
        assert!(matches!(
            log.append(&id, &record, &wrong_cid).unwrap_err(),
            LedgerError::PayloadMismatch { .. }
        ));
        // Nothing was committed.
        assert!(log.is_empty(&id).unwrap());
    }

    #[test]
    fn float_record_rejected_before_commit() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        let id = sid("floats");
        let record = json!({"speed": 1.25});
        let cid = cid_for(&json!({"speed": 1}));
        assert!(matches!(
            log.append(&id, &record, &cid).unwrap_err(),
            LedgerError::Canonicalization(_)
        ));
        assert!(log.is_empty(&id).unwrap());
    }

    #[test]
    fn concurrent_appenders_on_distinct_streams() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(AppendLog::new(dir.path()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    let id = StreamId::new(&format!("par-{t}")).unwrap();
                    for i in 0..20u64 {
                        let record = json!({"t": t, "i": i});
                        log.append(&id, &record, &cid_for(&record)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for t in 0..4 {
            let id = StreamId::new(&format!("par-{t}")).unwrap();
            assert_eq!(log.len(&id).unwrap(), 20);
            let frames: Vec<LogFrame> = log.scan(&id, 0).unwrap().map(|r| r.unwrap()).collect();
            for (i, f) in frames.iter().enumerate() {
                assert_eq!(f.entry.seq, i as u64);
            }
        }
    }

    #[test]
    fn scanner_runs_alongside_writer() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(AppendLog::new(dir.path()).with_durability(false));
        let id = sid("busy");
        append_n(&log, &id, 10);

        let writer = {
            let log = log.clone();
            let id = id.clone();
            std::thread::spawn(move || {
                for i in 10..60u64 {
                    let record = json!({"n": i});
                    log.append(&id, &record, &cid_for(&record)).unwrap();
                }
            })
        };

        // Scans observe a consistent prefix while the writer runs.
        for _ in 0..20 {
            let frames: Vec<LogFrame> = log.scan(&id, 0).unwrap().map(|r| r.unwrap()).collect();
            assert!(frames.len() >= 10);
            for (i, f) in frames.iter().enumerate() {
                assert_eq!(f.entry.seq, i as u64);
            }
        }
        writer.join().unwrap();
        assert_eq!(log.len(&id).unwrap(), 60);
    }

    #[test]
    fn deadline_expires_while_lock_held() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(AppendLog::new(dir.path()));
        let id = sid("contended");
        log.open(&id).unwrap();

        let handle = log.handle(&id).unwrap();
        let guard = handle.writer.lock();

        let record = json!({"n": 0});
        let deadline = Instant::now() + std::time::Duration::from_millis(30);
        let result = log.append_with_deadline(&id, &record, &cid_for(&record), Some(deadline));
        assert!(matches!(result.unwrap_err(), LedgerError::Timeout { .. }));
        drop(guard);

        // After the lock frees, the same append succeeds.
        log.append(&id, &record, &cid_for(&record)).unwrap();
    }

    #[test]
    fn attached_schema_registry_gates_appends() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(crate::schema::SchemaRegistry::new());
        registry
            .register(
                "Reading.v1",
                &json!({
                    "type": "object",
                    "required": ["schema_version", "value"],
                    "properties": {"value": {"type": "integer"}}
                }),
            )
            .unwrap();
        let log = AppendLog::new(dir.path()).with_schema_registry(registry);
        let id = sid("gated");

        let good = json!({"schema_version": "Reading.v1", "value": 7});
        log.append(&id, &good, &cid_for(&good)).unwrap();

        let bad = json!({"schema_version": "Reading.v1", "value": "seven"});
        assert!(matches!(
            log.append(&id, &bad, &cid_for(&bad)).unwrap_err(),
            LedgerError::SchemaValidation { .. }
        ));
        assert_eq!(log.len(&id).unwrap(), 1);
    }

    #[test]
    fn close_then_reopen_stream() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        let id = sid("lifecycle");
        append_n(&log, &id, 2);
        log.close(&id);
        assert_eq!(log.len(&id).unwrap(), 2);
    }
}
