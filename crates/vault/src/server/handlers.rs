//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    DecryptRequest, DecryptResponse, ErrorResponse, HealthResponse, OpenRequest, OpenResponse,
    SealRequest, SealResponse,
};
use common::ServiceError;
use tracing::{info, warn};

use super::state::AppState;
use crate::crypto::PLAIN_MARKER;
use crate::records::{self, Category};

/// `POST /records/:category/seal` — encrypt the sensitive columns of a row
/// before it is persisted.
///
/// The destination table decides between real encryption and marked
/// plaintext. It defaults to the category's own table.
pub async fn seal(
    State(state): State<AppState>,
    Path(category): Path<Category>,
    Json(req): Json<SealRequest>,
) -> Response {
    let table = req.table.as_deref().unwrap_or(category.table());
    let supports_iv = state.iv_tables.supports_iv(table);
    if !supports_iv {
        info!(?category, table, "table has no IV columns; storing marked plaintext");
    }

    match records::seal_row(&state.cipher, category, supports_iv, req.row) {
        Ok(row) => (StatusCode::OK, Json(SealResponse { row })).into_response(),
        Err(e) => {
            warn!(error = %e, ?category, "row rejected");
            error_response(ServiceError::BadRequest(e.to_string()))
        }
    }
}

/// `POST /records/:category/open` — decrypt the sensitive columns of rows
/// fetched from storage.
///
/// Never fails on a per-value basis: values that cannot be decrypted are
/// returned as stored.
pub async fn open(
    State(state): State<AppState>,
    Path(category): Path<Category>,
    Json(req): Json<OpenRequest>,
) -> Response {
    let rows = req
        .rows
        .into_iter()
        .map(|row| records::open_row(&state.cipher, category, row))
        .collect();
    (StatusCode::OK, Json(OpenResponse { rows })).into_response()
}

/// `POST /decrypt` — decrypt a single stored value.
///
/// Marked or IV-less values are returned as plaintext. With `strict` set, a
/// value no key can decrypt is a `422`; otherwise it is echoed back.
pub async fn decrypt(State(state): State<AppState>, Json(req): Json<DecryptRequest>) -> Response {
    let stored = match req.encrypted_data.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => {
            return error_response(ServiceError::BadRequest(
                "encryptedData is required".into(),
            ))
        }
    };
    let iv = req.iv.as_deref().filter(|iv| !iv.is_empty());

    let decrypted_data = match (req.strict, iv) {
        (true, Some(iv)) if !stored.starts_with(PLAIN_MARKER) => {
            match state.cipher.decrypt(stored, iv) {
                Ok(plaintext) => plaintext,
                Err(e) => return error_response(ServiceError::DecryptionFailure(e.to_string())),
            }
        }
        _ => state
            .cipher
            .decrypt_or_plain(Some(stored), iv)
            .unwrap_or_default(),
    };

    (StatusCode::OK, Json(DecryptResponse { decrypted_data })).into_response()
}

/// `GET /health` — liveness check.
///
/// Keys are validated before the server starts, so a listening server is
/// always ready.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        legacy_key_is_default: state.cipher.keys().legacy_is_default(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server() -> TestServer {
        TestServer::new(router::build(AppState::for_tests())).unwrap()
    }

    #[tokio::test]
    async fn health_reports_configured_legacy_key() {
        let resp = server().get("/health").await;
        resp.assert_status_ok();
        let body: HealthResponse = resp.json();
        assert_eq!(body.status, "ok");
        assert!(!body.legacy_key_is_default);
    }

    #[tokio::test]
    async fn seal_then_open_insulin_row() {
        let server = server();
        let sealed = server
            .post("/records/insulin/seal")
            .json(&json!({"row": {"insulinType": "Lantus", "dose": 12.5, "date_time": "2024-01-01 10:00:00"}}))
            .await;
        sealed.assert_status_ok();
        let row = sealed.json::<SealResponse>().row;
        assert_ne!(row["dose"], "12.5");
        assert!(row["dose_iv"].is_string());
        assert_eq!(row["date_time"], "2024-01-01 10:00:00");

        let opened = server
            .post("/records/insulin/open")
            .json(&json!({"rows": [row]}))
            .await;
        opened.assert_status_ok();
        let rows = opened.json::<OpenResponse>().rows;
        assert_eq!(rows[0]["dose"], "12.5");
        assert_eq!(rows[0]["insulinType"], "Lantus");
    }

    #[tokio::test]
    async fn seal_into_table_without_iv_marks_values() {
        let resp = server()
            .post("/records/food/seal")
            .json(&json!({"table": "fooddata_archive", "row": {"food_type": "Arroz", "carbs": 45}}))
            .await;
        resp.assert_status_ok();
        let row = resp.json::<SealResponse>().row;
        assert_eq!(row["food_type"], "__PLAIN__Arroz");
        assert_eq!(row["carbs"], "__PLAIN__45");
        assert_eq!(row["carbs_iv"], Value::Null);
    }

    #[tokio::test]
    async fn seal_rejects_object_value() {
        let resp = server()
            .post("/records/food/seal")
            .json(&json!({"row": {"quantity": {"g": 100}}}))
            .await;
        resp.assert_status_bad_request();
        let err: ErrorResponse = resp.json();
        assert_eq!(err.code, "bad_request");
    }

    #[tokio::test]
    async fn decrypt_requires_encrypted_data() {
        let resp = server().post("/decrypt").json(&json!({"iv": "00"})).await;
        resp.assert_status_bad_request();
    }

    #[tokio::test]
    async fn decrypt_marked_value() {
        let resp = server()
            .post("/decrypt")
            .json(&json!({"encryptedData": "__PLAIN__hello", "iv": "deadbeefdeadbeefdeadbeefdeadbeef"}))
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<DecryptResponse>().decrypted_data, "hello");
    }

    #[tokio::test]
    async fn decrypt_encrypted_value() {
        let state = AppState::for_tests();
        let enc = state.cipher.encrypt("12.5");
        let server = TestServer::new(router::build(state)).unwrap();
        let resp = server
            .post("/decrypt")
            .json(&json!({"encryptedData": enc.ciphertext, "iv": enc.iv, "strict": true}))
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<DecryptResponse>().decrypted_data, "12.5");
    }

    #[tokio::test]
    async fn decrypt_garbage_fails_open() {
        let resp = server()
            .post("/decrypt")
            .json(&json!({"encryptedData": "garbledhex", "iv": "badiv"}))
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<DecryptResponse>().decrypted_data, "garbledhex");
    }

    #[tokio::test]
    async fn strict_decrypt_garbage_is_422() {
        let resp = server()
            .post("/decrypt")
            .json(&json!({"encryptedData": "garbledhex", "iv": "badiv", "strict": true}))
            .await;
        resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = resp.json();
        assert_eq!(err.code, "decryption_failure");
    }
}
