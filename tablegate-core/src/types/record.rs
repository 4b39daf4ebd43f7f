//! Records as stored and returned by adapters.

use serde_json::{Map, Value};

use crate::constants::ID_FIELD;

/// A record: a mapping from field name to JSON value.
///
/// Every stored record carries its identifier under [`ID_FIELD`] and may carry
/// `created_at` / `updated_at` timestamps.
pub type Record = Map<String, Value>;

/// Returns the identifier of a record as an opaque string.
///
/// Numeric identifiers (common for SQL backends) are rendered in decimal.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
