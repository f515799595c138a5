//! # Schema Registry — Optional Validation at Ingestion
//!
//! The ledger is schema-agnostic for hashing and chain maintenance; every
//! record is just a canonical tree. Producers that want shape guarantees
//! register a JSON Schema per `schema_version`, and the log validates
//! records against it before anything is committed.
//!
//! In lenient mode (default) records with no `schema_version` or an
//! unregistered version pass through untouched. In strict mode both are
//! rejected.

use dashmap::DashMap;
use serde_json::Value;

use crate::error::LedgerError;

/// Registry of JSON Schema validators keyed by `schema_version`.
pub struct SchemaRegistry {
    strict: bool,
    validators: DashMap<String, jsonschema::Validator>,
}

impl SchemaRegistry {
    /// Create a lenient registry: only registered versions are validated.
    pub fn new() -> Self {
        Self {
            strict: false,
            validators: DashMap::new(),
        }
    }

    /// Create a strict registry: every record must declare a registered
    /// `schema_version`.
    pub fn strict() -> Self {
        Self {
            strict: true,
            validators: DashMap::new(),
        }
    }

    /// Register a schema for a version. Replaces any previous schema for
    /// the same version.
    pub fn register(&self, schema_version: &str, schema: &Value) -> Result<(), LedgerError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| LedgerError::SchemaValidation {
                schema_version: schema_version.to_string(),
                detail: format!("schema does not compile: {e}"),
            })?;
        self.validators
            .insert(schema_version.to_string(), validator);
        Ok(())
    }

    /// Number of registered schema versions.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no schemas are registered.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validate a record against the schema its `schema_version` names.
    pub fn validate(&self, record: &Value) -> Result<(), LedgerError> {
        let version = record
            .as_object()
            .and_then(|o| o.get("schema_version"))
            .and_then(|v| v.as_str());

        let version = match version {
            Some(v) => v,
            None => {
                if self.strict {
                    return Err(LedgerError::SchemaValidation {
                        schema_version: "<absent>".to_string(),
                        detail: "record carries no schema_version".to_string(),
                    });
                }
                return Ok(());
            }
        };

        let validator = match self.validators.get(version) {
            Some(v) => v,
            None => {
                if self.strict {
                    return Err(LedgerError::SchemaValidation {
                        schema_version: version.to_string(),
                        detail: "no schema registered for this version".to_string(),
                    });
                }
                return Ok(());
            }
        };

        let errors: Vec<String> = validator
            .iter_errors(record)
            .map(|e| format!("{}: {e}", e.instance_path))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::SchemaValidation {
                schema_version: version.to_string(),
                detail: errors.join("; "),
            })
        }
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
