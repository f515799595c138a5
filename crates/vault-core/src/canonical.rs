//! # Canonical Serialization — JCS-Subset Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for
//! bytes entering the hash and signature domain anywhere in the vault stack.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through the constructors in this module, which apply the
//! full coercion pipeline (float rejection, depth bounding) before JCS
//! serialization.
//!
//! Any function that hashes or signs must accept `&CanonicalBytes`, so the
//! "wrong serialization path" defect class is structurally impossible.
//!
//! ## Canonical Form
//!
//! - Mapping keys sorted, each key at most once; no insignificant
//!   whitespace; separators are exactly `,` and `:` (RFC 8785 via
//!   `serde_jcs`).
//! - Strings escaped with the minimal JSON escapes; all other code points
//!   emitted as UTF-8.
//! - Integers as shortest decimal. Floats, `NaN` and `Inf` are rejected
//!   with `InvalidScalar`; producers quantize to integers in a declared
//!   unit before handing records to the vault.
//! - Sequences preserve producer order.

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Maximum nesting depth accepted by the coercion walk. Producer state is
/// a tree; anything deeper than this is treated as a cycle artifact.
const MAX_DEPTH: usize = 128;

/// Bytes produced exclusively by JCS-subset canonicalization.
///
/// # Invariants
///
/// - The only constructors are [`CanonicalBytes::new()`],
///   [`CanonicalBytes::from_value()`], and [`CanonicalBytes::parse_strict()`].
/// - No float ever survives into the byte sequence.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
///
/// Two records compare equal by deep structural equality iff their
/// `CanonicalBytes` are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the standard ingestion path. All digest and signature
    /// computation in the workspace must flow through here.
    ///
    /// # Errors
    ///
    /// - `InvalidScalar` if the value contains a float.
    /// - `NonStringKey` if a map serializes with non-string keys.
    /// - `CycleDetected` if nesting exceeds the depth bound.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj).map_err(classify_ser_error)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value tree.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        check_value(&value, 0)?;
        let bytes = serialize_canonical(&value)?;
        Ok(Self(bytes))
    }

    /// Parse JSON source text strictly and canonicalize it.
    ///
    /// Unlike `serde_json`'s default behavior (last duplicate key wins),
    /// this path rejects duplicate object keys with `DuplicateKey`. Use it
    /// at trust boundaries where the raw JSON text is available.
    pub fn parse_strict(text: &str) -> Result<Self, CanonicalizationError> {
        let StrictValue(value) =
            serde_json::from_str(text).map_err(classify_parse_error)?;
        Self::from_value(value)
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Classify `serde_json::to_value` failures. Maps with non-string keys fail
/// serialization with a "key must be a string" message; everything else is
/// a plain serialization failure.
fn classify_ser_error(err: serde_json::Error) -> CanonicalizationError {
    let msg = err.to_string();
    if msg.contains("key must be a string") {
        CanonicalizationError::NonStringKey(msg)
    } else {
        CanonicalizationError::SerializationFailed(err)
    }
}

/// Classify strict-parse failures. The `StrictValue` visitor reports
/// duplicate keys through a custom message with a fixed prefix.
fn classify_parse_error(err: serde_json::Error) -> CanonicalizationError {
    let msg = err.to_string();
    if let Some(rest) = msg.strip_prefix(DUPLICATE_KEY_PREFIX) {
        let key = rest.split(" at line").next().unwrap_or(rest).to_string();
        CanonicalizationError::DuplicateKey(key)
    } else {
        CanonicalizationError::SerializationFailed(err)
    }
}

/// Recursively validate a JSON value against the canonical subset.
///
/// 1. `null`, `bool`, `string`, `integer` — accepted.
/// 2. `float` — rejected with `InvalidScalar`.
/// 3. `object` / `array` — recursed with a depth bound.
///
/// Keys are already strings here (`serde_json::Map<String, Value>`); the
/// non-string-key case is caught at the serialization boundary.
fn check_value(value: &Value, depth: usize) -> Result<(), CanonicalizationError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalizationError::CycleDetected {
            max_depth: MAX_DEPTH,
        });
    }
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::InvalidScalar(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                check_value(v, depth + 1)?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for v in arr {
                check_value(v, depth + 1)?;
            }
            Ok(())
        }
    }
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785).
///
/// `serde_jcs` produces sorted keys, compact separators, and UTF-8 output
/// with minimal escapes. Integers pass through as exact shortest decimals.
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}

// ---------------------------------------------------------------------------
// Strict parsing (duplicate-key rejection)
// ---------------------------------------------------------------------------

const DUPLICATE_KEY_PREFIX: &str = "duplicate object key: ";

/// A `serde_json::Value` deserialized with duplicate-key rejection.
struct StrictValue(Value);

impl<'de> Deserialize<'de> for StrictValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StrictVisitor;

        impl<'de> Visitor<'de> for StrictVisitor {
            type Value = StrictValue;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("any JSON value with unique object keys")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(StrictValue(Value::Null))
            }

            fn visit_bool<E>(self, b: bool) -> Result<Self::Value, E> {
                Ok(StrictValue(Value::Bool(b)))
            }

            fn visit_i64<E>(self, n: i64) -> Result<Self::Value, E> {
                Ok(StrictValue(Value::from(n)))
            }

            fn visit_u64<E>(self, n: u64) -> Result<Self::Value, E> {
                Ok(StrictValue(Value::from(n)))
            }

            fn visit_f64<E>(self, n: f64) -> Result<Self::Value, E> {
                // Floats are rejected later by the coercion walk; preserve
                // the value here so the error names the offending scalar.
                Ok(StrictValue(Value::from(n)))
            }

            fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(StrictValue(Value::String(s.to_owned())))
            }

            fn visit_string<E>(self, s: String) -> Result<Self::Value, E> {
                Ok(StrictValue(Value::String(s)))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::new();
                while let Some(StrictValue(v)) = seq.next_element()? {
                    out.push(v);
                }
                Ok(StrictValue(Value::Array(out)))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = serde_json::Map::new();
                while let Some(key) = map.next_key::<String>()? {
                    let StrictValue(v) = map.next_value()?;
                    if out.insert(key.clone(), v).is_some() {
                        return Err(serde::de::Error::custom(format!(
                            "{DUPLICATE_KEY_PREFIX}{key}"
                        )));
                    }
                }
                Ok(StrictValue(Value::Object(out)))
            }
        }

        deserializer.deserialize_any(StrictVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_mapping_sorts_keys() {
        let data = serde_json::json!({"b": 1, "a": [2, 3]});
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        assert_eq!(cb.as_bytes(), br#"{"a":[2,3],"b":1}"#);
        assert_eq!(cb.len(), 17);
    }

    #[test]
    fn nested_mappings_sort_at_every_level() {
        let data = serde_json::json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn float_rejected() {
        let data = serde_json::json!({"speed": 1.5});
        match CanonicalBytes::new(&data).unwrap_err() {
            CanonicalizationError::InvalidScalar(f) => assert_eq!(f, 1.5),
            other => panic!("expected InvalidScalar, got: {other}"),
        }
    }

    #[test]
    fn deeply_nested_float_rejected() {
        let data = serde_json::json!({"a": {"b": [{"c": 3.14}]}});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn integers_and_scalars_accepted() {
        let data = serde_json::json!({
            "count": 42,
            "neg": -42,
            "flag": true,
            "off": false,
            "nothing": null
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(
            s,
            r#"{"count":42,"flag":true,"neg":-42,"nothing":null,"off":false}"#
        );
    }

    #[test]
    fn max_64_bit_integers_pass_through_exactly() {
        let data = serde_json::json!({"max_i": i64::MAX, "max_u": u64::MAX, "min_i": i64::MIN});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert!(s.contains("9223372036854775807"));
        assert!(s.contains("18446744073709551615"));
        assert!(s.contains("-9223372036854775808"));
    }

    #[test]
    fn empty_mapping_and_sequence() {
        assert_eq!(
            CanonicalBytes::new(&serde_json::json!({})).unwrap().as_bytes(),
            b"{}"
        );
        assert_eq!(
            CanonicalBytes::new(&serde_json::json!([])).unwrap().as_bytes(),
            b"[]"
        );
    }

    #[test]
    fn unicode_passes_through_as_utf8() {
        let data = serde_json::json!({"name": "ré\u{1F600}"});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert!(s.contains('é'));
        assert!(s.contains('\u{1F600}'));
    }

    #[test]
    fn control_characters_escape_minimally() {
        let data = serde_json::json!({"s": "a\nb\tc\u{0001}"});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, "{\"s\":\"a\\nb\\tc\\u0001\"}");
    }

    #[test]
    fn integer_keys_stringify() {
        // serde stringifies primitive keys before they reach the tree,
        // matching the producer-side coercion rule.
        let mut map = std::collections::BTreeMap::new();
        map.insert(7u32, "seven");
        let cb = CanonicalBytes::new(&map).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"7":"seven"}"#);
    }

    #[test]
    fn non_string_keys_rejected() {
        let mut map = std::collections::BTreeMap::new();
        map.insert((1u8, 2u8), "pair");
        match CanonicalBytes::new(&map).unwrap_err() {
            CanonicalizationError::NonStringKey(_) => {}
            other => panic!("expected NonStringKey, got: {other}"),
        }
    }

    #[test]
    fn nesting_beyond_bound_rejected() {
        let mut v = serde_json::json!(1);
        for _ in 0..200 {
            v = serde_json::json!([v]);
        }
        match CanonicalBytes::from_value(v).unwrap_err() {
            CanonicalizationError::CycleDetected { max_depth } => {
                assert_eq!(max_depth, 128)
            }
            other => panic!("expected CycleDetected, got: {other}"),
        }
    }

    #[test]
    fn parse_strict_accepts_unique_keys() {
        let cb = CanonicalBytes::parse_strict(r#"{"b":1,"a":[2,3]}"#).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"a":[2,3],"b":1}"#);
    }

    #[test]
    fn parse_strict_rejects_duplicate_keys() {
        match CanonicalBytes::parse_strict(r#"{"a":1,"a":2}"#).unwrap_err() {
            CanonicalizationError::DuplicateKey(key) => assert_eq!(key, "a"),
            other => panic!("expected DuplicateKey, got: {other}"),
        }
    }

    #[test]
    fn parse_strict_rejects_nested_duplicate_keys() {
        let text = r#"{"outer":{"x":1,"x":2}}"#;
        assert!(matches!(
            CanonicalBytes::parse_strict(text).unwrap_err(),
            CanonicalizationError::DuplicateKey(_)
        ));
    }

    #[test]
    fn parse_strict_rejects_float_source() {
        assert!(matches!(
            CanonicalBytes::parse_strict(r#"{"v":2.0}"#).unwrap_err(),
            CanonicalizationError::InvalidScalar(_)
        ));
    }

    #[test]
    fn parse_strict_rejects_malformed_json() {
        assert!(matches!(
            CanonicalBytes::parse_strict("{not json").unwrap_err(),
            CanonicalizationError::SerializationFailed(_)
        ));
    }

    #[test]
    fn round_trip_is_stable() {
        let data = serde_json::json!({"z": {"k": [1, "two", null]}, "a": true});
        let once = CanonicalBytes::new(&data).unwrap();
        let reparsed: Value = serde_json::from_slice(once.as_bytes()).unwrap();
        let twice = CanonicalBytes::from_value(reparsed).unwrap();
        assert_eq!(once, twice);
    }
}
