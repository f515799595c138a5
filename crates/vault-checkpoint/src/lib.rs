//! # vault-checkpoint — Capsule Chains over Producer State
//!
//! A producer (a simulation, a training loop, any deterministic process)
//! periodically hands its canonical state to the [`CheckpointEngine`]. The
//! engine freezes the state into a content-addressed payload, wraps it in
//! a [`CheckpointCapsule`] linked to its parent capsule by CID, and
//! appends the capsule to the producer's stream.
//!
//! ## Replay property
//!
//! Re-running a producer from the same seed through the same operation
//! sequence regenerates byte-identical capsules and an identical chain.
//! The engine enforces this by keeping wall-clock and host-identifying
//! fields out of the hashed capsule entirely; ingestion time lives in the
//! unhashed `ts_ingested` field of the chain entry, never in the capsule.

pub mod capsule;
pub mod engine;
pub mod error;

pub use capsule::{CheckpointCapsule, CAPSULE_SCHEMA_VERSION};
pub use engine::{CheckpointEngine, ReplayProducer, SeqEnforce, SnapshotOutcome};
pub use error::CheckpointError;
