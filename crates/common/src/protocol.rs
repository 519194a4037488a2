//! Request and response types exchanged between the vault and its callers.
//!
//! The write-path handlers of the tracking backend seal rows before
//! persisting them; the read-path handlers open rows after fetching them.
//! Rows are carried as plain JSON objects because each data category has its
//! own column set.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Record endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /records/:category/seal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealRequest {
    /// Destination table. Defaults to the category's own table when omitted.
    #[serde(default)]
    pub table: Option<String>,
    /// Row to seal, keyed by column name.
    pub row: serde_json::Map<String, serde_json::Value>,
}

/// Successful response body for `POST /records/:category/seal`.
///
/// Sensitive columns hold ciphertext (or marked plaintext) and each has its
/// `<column>_iv` sibling populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealResponse {
    pub row: serde_json::Map<String, serde_json::Value>,
}

/// Request body for `POST /records/:category/open`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRequest {
    /// Rows exactly as persisted, including their `_iv` columns.
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Successful response body for `POST /records/:category/open`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenResponse {
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

// ---------------------------------------------------------------------------
// Single-value decrypt endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    /// Stored value: hex ciphertext, marked plaintext, or legacy plaintext.
    #[serde(default)]
    pub encrypted_data: Option<String>,
    /// Hex IV stored alongside the value, if any.
    #[serde(default)]
    pub iv: Option<String>,
    /// When `true`, a value that no key can decrypt is reported as an error
    /// instead of being echoed back.
    #[serde(default)]
    pub strict: bool,
}

/// Successful response body for `POST /decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptResponse {
    pub decrypted_data: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status; always `"ok"` once the server is listening.
    pub status: String,
    /// Whether the legacy key is the built-in development key rather than a
    /// configured one.
    pub legacy_key_is_default: bool,
}
