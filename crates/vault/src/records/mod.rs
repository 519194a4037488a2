//! Sealing and opening whole rows of each data category.
//!
//! # Responsibilities
//!
//! - Know which columns of each category are sensitive and where their IVs live.
//! - Know which tables have `_iv` columns and which columns are dates.
//! - Turn those facts into the two flags the field cipher takes.
//!
//! # Module invariants
//!
//! - Non-sensitive columns (ids, usernames, dates, numeric scores) pass
//!   through untouched in both directions.
//! - Opening never fails; a value no key can decrypt is returned as stored.

pub mod category;
pub mod tables;

pub use category::{is_date_field, Category, ColumnKind};
pub use tables::IvTables;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::crypto::{FieldCipher, StoredField};

/// A JSON row keyed by column name.
pub type Row = Map<String, Value>;

/// Errors produced while sealing a row.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A sensitive column held a value that has no text form.
    #[error("column {column} holds {found}; expected a string or number")]
    UnsupportedValue { column: String, found: &'static str },
}

/// The two field operations the record layer needs from a cipher.
///
/// Null values never reach the codec; the record layer keeps them null.
#[cfg_attr(test, mockall::automock)]
pub trait FieldCodec {
    /// Stored form of a non-null value.
    fn seal(&self, text: &str, supports_iv: bool, is_date_field: bool) -> StoredField;
    /// Plaintext of a non-null stored value. `iv` is empty when the row has none.
    fn open(&self, stored: &str, iv: &str) -> String;
}

impl FieldCodec for FieldCipher {
    fn seal(&self, text: &str, supports_iv: bool, is_date_field: bool) -> StoredField {
        self.encrypt_or_mark(Some(text), supports_iv, is_date_field)
    }

    fn open(&self, stored: &str, iv: &str) -> String {
        self.decrypt_or_plain(Some(stored), Some(iv))
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Encrypt (or mark) every sensitive column present in `row` and fill in
/// the `_iv` siblings.
///
/// Numbers and booleans are stored by their text form. Array columns seal
/// each element and store a parallel array of IVs.
///
/// # Errors
///
/// Returns [`RecordError::UnsupportedValue`] if a sensitive column holds an
/// object, or an array column holds a nested array or object.
pub fn seal_row<C: FieldCodec + ?Sized>(
    codec: &C,
    category: Category,
    supports_iv: bool,
    mut row: Row,
) -> Result<Row, RecordError> {
    for column in category.sensitive_columns() {
        let Some(value) = row.get(column.name) else {
            continue;
        };
        let is_date = is_date_field(column.name);
        let (sealed, iv) = match (column.kind, value) {
            (ColumnKind::Array, Value::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                let mut ivs = Vec::with_capacity(items.len());
                for item in items {
                    let stored = seal_value(codec, column.name, item, supports_iv, is_date)?;
                    values.push(optional(stored.value));
                    ivs.push(optional(stored.iv));
                }
                (Value::Array(values), Value::Array(ivs))
            }
            (ColumnKind::Array, Value::Null) => (Value::Null, Value::Null),
            (ColumnKind::Array, other) => {
                // A single value in a list column is sealed as a one-element list.
                let stored = seal_value(codec, column.name, other, supports_iv, is_date)?;
                (
                    Value::Array(vec![optional(stored.value)]),
                    Value::Array(vec![optional(stored.iv)]),
                )
            }
            (ColumnKind::Scalar | ColumnKind::OptionalText, value) => {
                let stored = seal_value(codec, column.name, value, supports_iv, is_date)?;
                (optional(stored.value), optional(stored.iv))
            }
        };
        row.insert(column.name.to_owned(), sealed);
        row.insert(column.iv_column.to_owned(), iv);
    }
    Ok(row)
}

fn seal_value<C: FieldCodec + ?Sized>(
    codec: &C,
    column: &str,
    value: &Value,
    supports_iv: bool,
    is_date: bool,
) -> Result<StoredField, RecordError> {
    Ok(match scalar_text(column, value)? {
        Some(text) => codec.seal(&text, supports_iv, is_date),
        None => StoredField {
            value: None,
            iv: None,
        },
    })
}

fn scalar_text(column: &str, value: &Value) -> Result<Option<String>, RecordError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) => Err(RecordError::UnsupportedValue {
            column: column.to_owned(),
            found: "an array",
        }),
        Value::Object(_) => Err(RecordError::UnsupportedValue {
            column: column.to_owned(),
            found: "an object",
        }),
    }
}

fn optional(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Decrypt every sensitive column present in `row`.
///
/// `_iv` columns are left in place. Array columns open to a list of strings
/// where empty or missing elements become `""`. A null free-text column such
/// as `other_emotion` also opens to `""`.
pub fn open_row<C: FieldCodec + ?Sized>(codec: &C, category: Category, mut row: Row) -> Row {
    for column in category.sensitive_columns() {
        let opened = match column.kind {
            ColumnKind::Scalar => {
                let Some(Value::String(stored)) = row.get(column.name) else {
                    continue;
                };
                let iv = row
                    .get(column.iv_column)
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Value::String(codec.open(stored, iv))
            }
            ColumnKind::OptionalText => match row.get(column.name) {
                None => continue,
                Some(Value::String(stored)) if !stored.is_empty() => {
                    let iv = row
                        .get(column.iv_column)
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    Value::String(codec.open(stored, iv))
                }
                Some(Value::String(_) | Value::Null) => Value::String(String::new()),
                Some(_) => continue,
            },
            ColumnKind::Array => {
                let Some(value) = row.get(column.name) else {
                    continue;
                };
                let items = parse_list(value);
                let ivs = row.get(column.iv_column).map(parse_list).unwrap_or_default();
                let opened = items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| match item {
                        Some(stored) => {
                            let iv = ivs.get(idx).and_then(|iv| iv.as_deref());
                            codec.open(stored, iv.unwrap_or_default())
                        }
                        None => String::new(),
                    })
                    .map(Value::String)
                    .collect();
                Value::Array(opened)
            }
        };
        row.insert(column.name.to_owned(), opened);
    }
    row
}

/// Normalise a list column as it may come back from storage: a JSON array,
/// a JSON-encoded array string, or a comma-separated string.
fn parse_list(value: &Value) -> Vec<Option<String>> {
    match value {
        Value::Array(items) => items.iter().map(list_item).collect(),
        Value::String(s) => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(items) => items.iter().map(list_item).collect(),
            Err(_) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Some(item.to_owned()))
                .collect(),
        },
        _ => Vec::new(),
    }
}

fn list_item(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() && s != "null" && s != "undefined" => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
