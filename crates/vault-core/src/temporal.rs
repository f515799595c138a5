//! # Temporal Types — UTC-Only Timestamps
//!
//! `Timestamp` is a UTC-only timestamp truncated to seconds, rendered as
//! ISO-8601 with a `Z` suffix. Timestamps never participate in digests;
//! they live in unhashed sibling fields (`ts_ingested`) or in signed
//! receipt fields that the caller supplied and chose to commit to.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TimeError;

/// A UTC timestamp with seconds precision.
///
/// Serializes as `YYYY-MM-DDTHH:MM:SSZ`. Sub-second components are
/// truncated on construction so that re-parsing a rendered timestamp is
/// always the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        let now = Utc::now();
        Self(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Wrap a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Parse a strict ISO-8601 UTC timestamp.
    ///
    /// The input must be RFC 3339 with a literal `Z` suffix; numeric
    /// offsets (even `+00:00`) are rejected so that every rendered
    /// timestamp in the system has exactly one textual form.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        if !s.ends_with('Z') {
            return Err(TimeError::NotUtc(s.to_string()));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| TimeError::Invalid {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_datetime(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO-8601 with Z suffix (e.g., `2026-01-20T20:40:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
