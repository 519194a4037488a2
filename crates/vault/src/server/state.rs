//! Shared application state injected into every Axum handler.

use crate::crypto::FieldCipher;
use crate::records::IvTables;

/// Application state shared across all request handlers.
///
/// Both fields are `Arc`-backed, so Axum can clone the state for each
/// request without copying key material or table lists.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Field cipher holding the current and legacy keys.
    pub cipher: FieldCipher,
    /// Tables that have `_iv` columns.
    pub iv_tables: IvTables,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(cipher: FieldCipher, iv_tables: IvTables) -> Self {
        Self { cipher, iv_tables }
    }
}

#[cfg(test)]
impl AppState {
    /// State with fixed test keys and the default IV tables.
    pub fn for_tests() -> Self {
        use crate::crypto::{keys::SecretKey, KeyRing, KEY_LEN};

        Self::new(
            FieldCipher::new(KeyRing::new(
                SecretKey::from([0x22; KEY_LEN]),
                SecretKey::from([0x11; KEY_LEN]),
            )),
            IvTables::default(),
        )
    }
}
