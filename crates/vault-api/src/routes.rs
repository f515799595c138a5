//! # Route Handlers

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use vault_anchor::{AnchorReceipt, AnchorRequest};

use crate::error::AppError;
use crate::AppState;

/// `POST /vault/anchor/write` — the `VaultAnchorWrite.v1` wire contract.
pub async fn write_anchor(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<AnchorReceipt>, AppError> {
    let request = AnchorRequest::from_value(&body)?;
    let receipt = state.anchor.write_anchor(&request)?;
    Ok(Json(receipt))
}

/// `GET /health` — liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    use vault_anchor::AnchorService;
    use vault_crypto::{ContentStore, LocalKeyProvider, PublicKeyArchive};
    use vault_ledger::AppendLog;

    use crate::error::ErrorBody;
    use crate::{app, AppState};

    fn test_state(dir: &std::path::Path) -> AppState {
        let anchor = AnchorService::init(
            Box::new(LocalKeyProvider::from_seed(&[1u8; 32])),
            Arc::new(AppendLog::new(dir.join("log"))),
            Arc::new(ContentStore::new(dir.join("cas"))),
            PublicKeyArchive::new(dir.join("keys")),
        )
        .unwrap();
        AppState {
            anchor: Arc::new(anchor),
        }
    }

    fn anchor_body() -> Value {
        json!({
            "schema_version": "VaultAnchorWriteRequest.v1",
            "artifact_kind": "InferenceReceipt.v1",
            "payload_hash_sha256":
                "6a47c1eee539c79b6ed05d4766d01831099c4043dab1431aa3a9b82018b80e7b",
            "run_id": "run-X",
            "operator": "op",
            "ts": "2026-01-20T20:40:00Z"
        })
    }

    async fn post_anchor(
        router: axum::Router,
        body: &Value,
    ) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/vault/anchor/write")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn anchor_happy_path_returns_sealed_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let (status, body) = post_anchor(app(state), &anchor_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schema_version"], "VaultFossilizationReceipt.v1");
        assert_eq!(
            body["payload_hash"],
            anchor_body()["payload_hash_sha256"]
        );
        assert_eq!(body["sealed"], true);
        assert!(body["signature"].is_string());
        assert_eq!(body["anchor_hash"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn duplicate_anchor_is_409_and_ledger_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (first, _) = post_anchor(app(state.clone()), &anchor_body()).await;
        assert_eq!(first, StatusCode::OK);

        let (second, body) = post_anchor(app(state.clone()), &anchor_body()).await;
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DUPLICATE_ANCHOR");

        // The core itself still refuses the hash.
        let request = vault_anchor::AnchorRequest::from_value(&anchor_body()).unwrap();
        assert!(state.anchor.write_anchor(&request).is_err());
    }

    #[tokio::test]
    async fn missing_field_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut body = anchor_body();
        body.as_object_mut().unwrap().remove("ts");

        let (status, response) = post_anchor(app(state), &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "MISSING_REQUIRED_FIELD");
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("ts"));
    }

    #[tokio::test]
    async fn bad_payload_hash_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut body = anchor_body();
        body["payload_hash_sha256"] = json!("NOT-HEX");

        let (status, response) = post_anchor(app(state), &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "INVALID_PAYLOAD_HASH");
    }

    #[tokio::test]
    async fn wrong_schema_version_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut body = anchor_body();
        body["schema_version"] = json!("VaultAnchorWriteRequest.v0");

        let (status, response) = post_anchor(app(state), &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "INVALID_SCHEMA_VERSION");
    }

    #[tokio::test]
    async fn non_utc_timestamp_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut body = anchor_body();
        body["ts"] = json!("2026-01-20T20:40:00+05:00");

        let (status, response) = post_anchor(app(state), &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "INVALID_TIMESTAMP");
    }

    #[tokio::test]
    async fn torn_down_key_is_500_without_detail_leak() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.anchor.teardown();

        let (status, response) = post_anchor(app(state), &anchor_body()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response["error"]["code"], "KEY_UNAVAILABLE");
        let message = response["error"]["message"].as_str().unwrap();
        assert!(!message.contains("torn down"), "details must not leak: {message}");
    }

    #[tokio::test]
    async fn health_probe() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn error_body_shape_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut body = anchor_body();
        body["payload_hash_sha256"] = json!("bad");

        let router = app(state);
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/vault/anchor/write")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.error.code, "INVALID_PAYLOAD_HASH");
    }
}
