//! # vault-ledger — Append-Only Stream Persistence
//!
//! Durable, strictly ordered storage for hash-chained records:
//!
//! - [`chain`] — the stateless hash-chain helper: link computation and
//!   adjacency verification. Never invents order; the log's serialization
//!   decides `seq`.
//! - [`entry`] — [`ChainEntry`] and the on-disk frame shape.
//! - [`log`] — [`AppendLog`]: one framed, CRC-protected, append-only file
//!   per stream with torn-tail recovery, fsync-before-ack durability,
//!   per-stream writer locks, and lock-free readers.
//! - [`schema`] — opt-in validation of ingested records against JSON
//!   Schemas keyed by `schema_version`.
//!
//! ## Ordering guarantees
//!
//! Within a stream, appends observe a single total order matching `seq`.
//! A reader that takes the stream tip after an append acknowledgement sees
//! that entry. Cross-stream ordering is not defined.

pub mod chain;
pub mod entry;
pub mod error;
pub mod log;
pub mod schema;

pub use chain::{link, verify_pair, ChainDefect};
pub use entry::{ChainEntry, LogFrame};
pub use error::LedgerError;
pub use log::{AppendLog, ScanIter};
pub use schema::SchemaRegistry;
