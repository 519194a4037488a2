//! AES-256-CBC field encryption primitives and key material.
//!
//! This module is intentionally free of HTTP and schema knowledge. Callers
//! decide whether a table has an IV column and whether a column holds a
//! date; the cipher only acts on those two flags.
//!
//! # Stored format
//!
//! ```text
//! X    = hex(AES-256-CBC(key, iv, PKCS#7(plaintext)))   X_iv = hex(iv)
//! X    = "__PLAIN__" + plaintext                          X_iv = null
//! ```

pub mod cipher;
pub mod keys;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

pub use cipher::{FieldCipher, StoredField, PLAIN_MARKER};
pub use keys::KeyRing;
