//! AES-256-CBC encryption and decryption of individual string fields.
//!
//! Every value is encrypted under a fresh random 128-bit IV, so identical
//! plaintexts never share a ciphertext. Ciphertext and IV are stored as two
//! hex strings in sibling columns (`X` and `X_iv`).
//!
//! Decryption tries the legacy key before the current key. Rows written
//! before the key rotation still outnumber newer rows, so this order avoids a
//! failed attempt in the common case.
//!
//! # Double-encryption recovery
//!
//! Some historical rows were encrypted twice under the same key and IV. A
//! decrypted value that is all hex digits and longer than one hex-encoded
//! block (32 characters) is decrypted once more; when that second pass
//! succeeds its result wins. This is a heuristic: a genuine plaintext that
//! happens to be a long hex string *and* decrypts cleanly would be
//! misread. It is kept as-is because existing rows depend on it.

use std::sync::Arc;

use aes::Aes256;
use cbc::cipher::{
    block_padding::Pkcs7, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut,
    KeyIvInit,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, warn};

use super::keys::{KeyRing, SecretKey};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Byte length of a CBC initialisation vector (one AES block).
pub const IV_LEN: usize = 16;

/// Prefix marking a value stored unencrypted in a table without an IV column.
pub const PLAIN_MARKER: &str = "__PLAIN__";

/// A decrypted value longer than this that is all hex digits is treated as
/// a possibly double-encrypted ciphertext.
const DOUBLE_ENCRYPTION_MIN_HEX_LEN: usize = 2 * IV_LEN;

/// Output of a single [`FieldCipher::encrypt`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Hex-encoded ciphertext.
    pub ciphertext: String,
    /// Hex-encoded 16-byte IV.
    pub iv: String,
}

/// A value as it is written to its column pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredField {
    /// Column value: ciphertext, marked plaintext, or the input unchanged.
    pub value: Option<String>,
    /// `_iv` column value; `None` whenever the value was not encrypted.
    pub iv: Option<String>,
}

impl StoredField {
    fn passthrough(text: Option<&str>) -> Self {
        Self {
            value: text.map(str::to_owned),
            iv: None,
        }
    }
}

impl From<EncryptedField> for StoredField {
    fn from(field: EncryptedField) -> Self {
        Self {
            value: Some(field.ciphertext),
            iv: Some(field.iv),
        }
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Neither the legacy nor the current key could decrypt the value.
    #[error("value could not be decrypted with the legacy or the current key")]
    Undecryptable,
}

/// Which key epoch produced a successful decryption. Only used for logging.
#[derive(Debug, Clone, Copy)]
enum KeyEpoch {
    Legacy,
    Current,
}

/// Field cipher bound to a [`KeyRing`].
///
/// Cheap to clone; the key ring is shared and never mutated.
#[derive(Debug, Clone)]
pub struct FieldCipher {
    keys: Arc<KeyRing>,
}

impl FieldCipher {
    /// Create a cipher over the given keys.
    pub fn new(keys: KeyRing) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }

    /// The keys this cipher encrypts and decrypts with.
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Encrypt `plaintext` under the current key with a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> EncryptedField {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        encrypt_with_iv(self.keys.current(), &iv, plaintext)
    }

    /// Produce the stored form of `text` for a column.
    ///
    /// - `None` or empty text is passed through with no IV.
    /// - Date/time columns are passed through with no IV so they stay
    ///   sortable and queryable.
    /// - Tables with an `_iv` column get real encryption.
    /// - Other tables get the text prefixed with [`PLAIN_MARKER`] and no IV.
    pub fn encrypt_or_mark(
        &self,
        text: Option<&str>,
        supports_iv: bool,
        is_date_field: bool,
    ) -> StoredField {
        let text = match text {
            Some(t) if !t.is_empty() => t,
            other => return StoredField::passthrough(other),
        };
        if is_date_field {
            return StoredField::passthrough(Some(text));
        }
        if supports_iv {
            self.encrypt(text).into()
        } else {
            StoredField {
                value: Some(format!("{PLAIN_MARKER}{text}")),
                iv: None,
            }
        }
    }

    /// Decrypt a hex ciphertext/IV pair, trying the legacy key first and the
    /// current key second.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Undecryptable`] if neither key yields a
    /// non-empty UTF-8 plaintext. This means the value is corrupt or was
    /// written under an unknown key.
    pub fn decrypt(&self, ciphertext: &str, iv: &str) -> Result<String, CipherError> {
        for (epoch, key) in [
            (KeyEpoch::Legacy, self.keys.legacy()),
            (KeyEpoch::Current, self.keys.current()),
        ] {
            if let Some(plaintext) = decrypt_with_key(key, ciphertext, iv) {
                debug!(key_epoch = ?epoch, "field decrypted");
                return Ok(plaintext);
            }
        }
        Err(CipherError::Undecryptable)
    }

    /// Recover the plaintext of a stored value, never failing.
    ///
    /// The marker takes priority over any IV. A value without an IV is
    /// legacy plaintext written before encryption existed. A value that
    /// cannot be decrypted is returned unchanged.
    pub fn decrypt_or_plain(&self, stored: Option<&str>, iv: Option<&str>) -> Option<String> {
        let stored = match stored {
            Some(s) if !s.is_empty() => s,
            other => return other.map(str::to_owned),
        };
        if let Some(plain) = stored.strip_prefix(PLAIN_MARKER) {
            return Some(plain.to_owned());
        }
        let iv = match iv {
            Some(iv) if !iv.is_empty() => iv,
            _ => return Some(stored.to_owned()),
        };
        match self.decrypt(stored, iv) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                warn!(error = %e, "returning stored value undecrypted");
                Some(stored.to_owned())
            }
        }
    }
}

/// Encrypt under an explicit key and IV.
pub(crate) fn encrypt_with_iv(key: &SecretKey, iv: &[u8; IV_LEN], plaintext: &str) -> EncryptedField {
    let ciphertext = Aes256CbcEnc::new(
        GenericArray::from_slice(key.as_bytes()),
        GenericArray::from_slice(iv),
    )
    .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    EncryptedField {
        ciphertext: hex::encode(ciphertext),
        iv: hex::encode(iv),
    }
}

/// Decrypt under one key, unwrapping a double encryption if one is detected.
fn decrypt_with_key(key: &SecretKey, ciphertext: &str, iv: &str) -> Option<String> {
    let plaintext = try_decrypt(key, ciphertext, iv)?;
    if looks_double_encrypted(&plaintext) {
        if let Some(inner) = try_decrypt(key, &plaintext, iv) {
            debug!("double-encrypted field unwrapped");
            return Some(inner);
        }
    }
    Some(plaintext)
}

/// One decryption attempt. Any failure (bad hex, wrong IV length, bad
/// padding, invalid UTF-8) and an empty result all count as a miss.
fn try_decrypt(key: &SecretKey, ciphertext: &str, iv: &str) -> Option<String> {
    let iv = hex::decode(iv).ok()?;
    let data = hex::decode(ciphertext).ok()?;
    if data.is_empty() || data.len() % IV_LEN != 0 {
        return None;
    }
    let decryptor = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv).ok()?;
    let bytes = decryptor.decrypt_padded_vec_mut::<Pkcs7>(&data).ok()?;
    String::from_utf8(bytes).ok().filter(|s| !s.is_empty())
}

fn looks_double_encrypted(value: &str) -> bool {
    value.len() > DOUBLE_ENCRYPTION_MIN_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}
