//! [`KeyRing`]: the two AES-256 keys the field cipher works with.

use thiserror::Error;

use super::KEY_LEN;

/// Development key used as the legacy key when `ENCRYPTION_SECRET_KEY0` is unset.
///
/// Rows written before the key rotation in development environments were
/// encrypted under this value.
pub const DEFAULT_LEGACY_KEY_HEX: &str =
    "60a50cbe834cda3dc25fb9cede898cb20ffc76c9647e26022ceb2fece1e09b02";

/// Errors produced while loading key material. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The named key is not valid hexadecimal.
    #[error("{0} is not valid hex")]
    InvalidHex(&'static str),

    /// The named key decodes to the wrong number of bytes.
    #[error("{name} has invalid length: expected {KEY_LEN} bytes, got {len}")]
    InvalidLength { name: &'static str, len: usize },
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// The memory is overwritten with zeroes when the key is dropped.
#[derive(Clone)]
pub struct SecretKey(Box<[u8; KEY_LEN]>);

impl SecretKey {
    /// Decode a key from its 64-character hex representation.
    ///
    /// `name` is the configuration variable the value came from and is only
    /// used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidHex`] or [`KeyError::InvalidLength`].
    pub fn from_hex(name: &'static str, hex_key: &str) -> Result<Self, KeyError> {
        let mut bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidHex(name))?;
        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.iter_mut().for_each(|b| *b = 0);
            return Err(KeyError::InvalidLength { name, len });
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(&bytes);
        bytes.iter_mut().for_each(|b| *b = 0);
        Ok(Self(buf))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for SecretKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("SecretKey([REDACTED])")
    }
}

/// The current and legacy keys.
///
/// Built once at startup and shared read-only; rotating either key requires
/// a restart with new environment values.
#[derive(Debug, Clone)]
pub struct KeyRing {
    current: SecretKey,
    legacy: SecretKey,
    legacy_is_default: bool,
}

impl KeyRing {
    /// Build a key ring from already-decoded keys.
    pub fn new(current: SecretKey, legacy: SecretKey) -> Self {
        Self {
            current,
            legacy,
            legacy_is_default: false,
        }
    }

    /// Build a key ring from the configured hex strings.
    ///
    /// When `legacy_hex` is `None` (or blank) the legacy key falls back to
    /// [`DEFAULT_LEGACY_KEY_HEX`].
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] naming the offending variable if either key is
    /// malformed.
    pub fn from_hex(current_hex: &str, legacy_hex: Option<&str>) -> Result<Self, KeyError> {
        let current = SecretKey::from_hex("ENCRYPTION_SECRET_KEY", current_hex)?;
        let (legacy, legacy_is_default) = match legacy_hex.filter(|k| !k.trim().is_empty()) {
            Some(k) => (SecretKey::from_hex("ENCRYPTION_SECRET_KEY0", k)?, false),
            None => (
                SecretKey::from_hex("ENCRYPTION_SECRET_KEY0", DEFAULT_LEGACY_KEY_HEX)?,
                true,
            ),
        };
        let mut ring = Self::new(current, legacy);
        ring.legacy_is_default = legacy_is_default;
        Ok(ring)
    }

    /// Key used for every new encryption.
    pub fn current(&self) -> &SecretKey {
        &self.current
    }

    /// Key from the previous epoch, tried first on decryption.
    pub fn legacy(&self) -> &SecretKey {
        &self.legacy
    }

    /// Returns `true` if the legacy key is the built-in development key.
    pub fn legacy_is_default(&self) -> bool {
        self.legacy_is_default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = "db0fdd8f597a24d13796c50d79cc2ea1965d6ab0301cdda78782e2e0d8e48dcc";

    #[test]
    fn decodes_valid_hex_key() {
        let key = SecretKey::from_hex("TEST", CURRENT).unwrap();
        assert_eq!(key.as_bytes()[0], 0xdb);
        assert_eq!(key.as_bytes()[KEY_LEN - 1], 0xcc);
    }

    #[test]
    fn rejects_non_hex_key() {
        let err = SecretKey::from_hex("TEST", "not-a-key").unwrap_err();
        assert!(matches!(err, KeyError::InvalidHex("TEST")));
    }

    #[test]
    fn rejects_short_key() {
        // 32 hex characters is a 16-byte (AES-128) key.
        let err = SecretKey::from_hex("TEST", "12345678901234567890123456789012").unwrap_err();
        assert!(matches!(err, KeyError::InvalidLength { len: 16, .. }));
    }

    #[test]
    fn legacy_defaults_when_unset() {
        let ring = KeyRing::from_hex(CURRENT, None).unwrap();
        assert!(ring.legacy_is_default());
        let expected = SecretKey::from_hex("X", DEFAULT_LEGACY_KEY_HEX).unwrap();
        assert_eq!(ring.legacy().as_bytes(), expected.as_bytes());
    }

    #[test]
    fn blank_legacy_counts_as_unset() {
        let ring = KeyRing::from_hex(CURRENT, Some("  ")).unwrap();
        assert!(ring.legacy_is_default());
    }

    #[test]
    fn configured_legacy_is_used() {
        let ring = KeyRing::from_hex(CURRENT, Some(&"ab".repeat(KEY_LEN))).unwrap();
        assert!(!ring.legacy_is_default());
        assert_eq!(ring.legacy().as_bytes(), &[0xab; KEY_LEN]);
    }

    #[test]
    fn malformed_current_key_names_variable() {
        let err = KeyRing::from_hex("zz", None).unwrap_err();
        assert!(err.to_string().contains("ENCRYPTION_SECRET_KEY"));
    }

    #[test]
    fn secret_key_redacted_in_debug() {
        let key = SecretKey::from([0xFF; KEY_LEN]);
        let ring = KeyRing::new(key.clone(), key);
        assert!(format!("{ring:?}").contains("REDACTED"));
        assert!(!format!("{ring:?}").contains("255"));
    }
}
