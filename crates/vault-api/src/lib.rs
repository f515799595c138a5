//! # vault-api — HTTP Adapter over the Anchor Service
//!
//! A deliberately thin surface: the core's operations are synchronous and
//! transport-agnostic; this crate only translates.
//!
//! | Route | Handler |
//! |---|---|
//! | `POST /vault/anchor/write` | [`routes::write_anchor`] |
//! | `GET /health` | liveness probe |
//!
//! Request bodies are decoded field-by-field through
//! [`AnchorRequest::from_value`](vault_anchor::AnchorRequest::from_value)
//! so that an absent field maps to `MissingRequiredField` (400) rather
//! than a generic deserialization failure.

pub mod config;
pub mod error;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use vault_anchor::AnchorService;

pub use config::VaultConfig;
pub use error::{AppError, ErrorBody};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The anchor service this node exposes.
    pub anchor: Arc<AnchorService>,
}

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/vault/anchor/write", post(routes::write_anchor))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
