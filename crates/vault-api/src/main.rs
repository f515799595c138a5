//! # Vault node entry point
//!
//! Assembles the anchor service from [`VaultConfig`] and serves the HTTP
//! surface. Bind address comes from `VAULT_BIND` (default
//! `127.0.0.1:8080`); the data directory from `VAULT_DATA_DIR` (default
//! `./vault-data`).

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vault_anchor::AnchorService;
use vault_api::{app, AppState, VaultConfig};
use vault_crypto::{ContentStore, PublicKeyArchive};
use vault_ledger::AppendLog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data_dir =
        std::env::var("VAULT_DATA_DIR").unwrap_or_else(|_| "./vault-data".to_string());
    let config = VaultConfig::from_env(&data_dir)?;

    let log = Arc::new(
        AppendLog::new(config.data_dir.join("log")).with_durability(config.stream_durable),
    );
    let store = Arc::new(ContentStore::new(config.data_dir.join("cas")));
    let archive = PublicKeyArchive::new(config.data_dir.join("keys"));
    let provider = config.key_source.load()?;
    let anchor = Arc::new(AnchorService::init(provider, log, store, archive)?);

    let state = AppState { anchor };
    let bind = std::env::var("VAULT_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, data_dir = %config.data_dir.display(), "vault node listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
