//! # vault-verify — Offline Audit of Streams, Receipts, and Capsule Chains
//!
//! The verifier is a pure consumer of the append log and content store.
//! It recomputes every hash from first principles and reports per-entry
//! verdicts. A single failure marks the stream BROKEN and halts writers
//! on it, but verification always walks to the end, so operators see all
//! defects at once, not just the first.

pub mod report;
pub mod verify;

pub use report::{EntryReport, EntryVerdict, ReceiptDefect, StreamReport, StreamStatus};
pub use verify::{verify_capsule_chain, verify_receipt, verify_stream, VerifyError};
