//! # vault-core — Foundational Types for the Vault Stack
//!
//! This crate is the bedrock of the vault stack. It defines the type-system
//! primitives that make the determinism guarantees of the ledger hold at
//! compile time. Every other crate in the workspace depends on `vault-core`;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** ALL digest and signature computation
//!    flows through `CanonicalBytes::new()`. No raw `serde_json::to_vec()`
//!    for digests. Ever. This prevents the canonicalization split defect
//!    class by construction.
//!
//! 2. **Digests only from canonical bytes.** `sha256_digest()` accepts only
//!    `&CanonicalBytes`; raw-byte hashing exists solely on the CID path,
//!    where the addressed unit *is* the byte sequence.
//!
//! 3. **Newtype wrappers for identifiers.** `StreamId`, `AnchorId`. No bare
//!    strings for identifiers that name durable state.
//!
//! 4. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision. Wall-clock values never participate in
//!    any hash; they live in unhashed sibling fields.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vault-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize` where they cross a wire or a file.

pub mod canonical;
pub mod cid;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use cid::{CidCodec, PayloadCid};
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CidError, IdError, TimeError};
pub use identity::{AnchorId, StreamId};
pub use temporal::Timestamp;
