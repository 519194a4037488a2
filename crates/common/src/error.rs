//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::DecryptionFailure`] → 422
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — missing field, unknown category, or a
    /// sensitive column holding a value that cannot be sealed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A strict decryption request could not be decrypted under any known key.
    #[error("decryption failure: {0}")]
    DecryptionFailure(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::DecryptionFailure(_) => 422,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::DecryptionFailure(_) => "decryption_failure",
        }
    }
}
