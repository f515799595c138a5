//! # Identifier Newtypes
//!
//! Newtype wrappers for the identifiers that name durable state. Type-level
//! distinction prevents passing a stream name where an anchor id is
//! expected, and the validated constructors keep identifier namespaces
//! filesystem- and wire-safe.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::IdError;

/// The name of an append-only stream.
///
/// Must match `^[a-z0-9][a-z0-9._-]{0,63}$`: lowercase alphanumerics plus
/// `.`, `_`, `-`, starting alphanumeric. Stream names double as log file
/// stems, so the charset is deliberately filesystem-safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(String);

impl StreamId {
    /// Create a validated stream id.
    pub fn new(s: &str) -> Result<Self, IdError> {
        let s = s.trim();
        if s.is_empty() || s.len() > 64 {
            return Err(IdError::InvalidStreamId(s.to_string()));
        }
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
            _ => return Err(IdError::InvalidStreamId(s.to_string())),
        }
        for c in chars {
            if !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')) {
                return Err(IdError::InvalidStreamId(s.to_string()));
            }
        }
        Ok(Self(s.to_string()))
    }

    /// Return the stream id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StreamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StreamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Opaque identifier minted for each anchor. UUIDv4 underneath, but
/// callers must treat it as opaque; only uniqueness is promised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(Uuid);

impl AnchorId {
    /// Mint a fresh anchor id.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (tests and replay).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from string form.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| IdError::InvalidAnchorId(e.to_string()))
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
