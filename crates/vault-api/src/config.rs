//! # Service Configuration
//!
//! Typed configuration for assembling a vault node, honoring the
//! recognized options:
//!
//! - `anchor.key_source` → `VAULT_ANCHOR_KEY_SOURCE` = `file` | `env` | `hsm`
//!   (with `VAULT_ANCHOR_KEY_FILE` / `VAULT_ANCHOR_KEY_ENV_VAR` naming the
//!   seed location)
//! - `anchor.stream_durable` → `VAULT_ANCHOR_STREAM_DURABLE` (default true)
//! - `content.mirror` → `VAULT_CONTENT_MIRROR` (external CAS endpoint, or
//!   empty for none)
//! - `checkpoint.seq_enforce` → `VAULT_CHECKPOINT_SEQ_ENFORCE` = `strict`
//!   (default) | `monotonic-nonstrict`

use std::path::PathBuf;

use vault_crypto::KeySource;

/// Where the anchor key seed lives by default when `env` is selected.
pub const DEFAULT_KEY_ENV_VAR: &str = "VAULT_SIGNING_KEY";

/// Tick enforcement selection, mirrored from `vault-checkpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqEnforceOption {
    /// Strictly increasing ticks (default).
    #[default]
    Strict,
    /// Non-decreasing ticks.
    MonotonicNonstrict,
}

/// Assembled node configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Root directory for the append log, content store, and key archive.
    pub data_dir: PathBuf,
    /// Where the anchor signing key comes from.
    pub key_source: KeySource,
    /// Whether anchor streams fsync before acknowledgement.
    pub stream_durable: bool,
    /// External CAS endpoint for mirroring, if any.
    pub content_mirror: Option<String>,
    /// Checkpoint tick enforcement.
    pub seq_enforce: SeqEnforceOption,
}

/// A configuration value that could not be interpreted.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {option} = {value:?} ({reason})")]
pub struct ConfigError {
    /// The offending option.
    pub option: &'static str,
    /// The value found.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl VaultConfig {
    /// Build a configuration from environment variables, with `data_dir`
    /// supplied by the caller.
    pub fn from_env(data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let key_source = match std::env::var("VAULT_ANCHOR_KEY_SOURCE").as_deref() {
            Ok("file") => {
                let path = std::env::var("VAULT_ANCHOR_KEY_FILE").map_err(|_| ConfigError {
                    option: "anchor.key_source",
                    value: "file".to_string(),
                    reason: "VAULT_ANCHOR_KEY_FILE is not set".to_string(),
                })?;
                KeySource::File(PathBuf::from(path))
            }
            Ok("env") | Err(_) => {
                let var = std::env::var("VAULT_ANCHOR_KEY_ENV_VAR")
                    .unwrap_or_else(|_| DEFAULT_KEY_ENV_VAR.to_string());
                KeySource::Env(var)
            }
            Ok("hsm") => KeySource::Hsm,
            Ok(other) => {
                return Err(ConfigError {
                    option: "anchor.key_source",
                    value: other.to_string(),
                    reason: "expected file, env, or hsm".to_string(),
                })
            }
        };

        let stream_durable = match std::env::var("VAULT_ANCHOR_STREAM_DURABLE").as_deref() {
            Err(_) | Ok("true") => true,
            Ok("false") => false,
            Ok(other) => {
                return Err(ConfigError {
                    option: "anchor.stream_durable",
                    value: other.to_string(),
                    reason: "expected true or false".to_string(),
                })
            }
        };

        let content_mirror = match std::env::var("VAULT_CONTENT_MIRROR") {
            Ok(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        };

        let seq_enforce = match std::env::var("VAULT_CHECKPOINT_SEQ_ENFORCE").as_deref() {
            Err(_) | Ok("strict") => SeqEnforceOption::Strict,
            Ok("monotonic-nonstrict") => SeqEnforceOption::MonotonicNonstrict,
            Ok(other) => {
                return Err(ConfigError {
                    option: "checkpoint.seq_enforce",
                    value: other.to_string(),
                    reason: "expected strict or monotonic-nonstrict".to_string(),
                })
            }
        };

        Ok(Self {
            data_dir: data_dir.into(),
            key_source,
            stream_durable,
            content_mirror,
            seq_enforce,
        })
    }
}
