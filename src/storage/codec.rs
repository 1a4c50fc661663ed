//! JSON encoding shared by the adapters
//!
//! Every backend stores values as JSON text. Decoding failures are reported
//! as [`StorageError::Decode`] so callers can tell unreadable data apart from
//! a missing key.

use crate::error::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize `value` to JSON text
pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Parse JSON text stored under `key`
pub fn decode<T: DeserializeOwned>(key: &str, text: &str) -> StorageResult<T> {
    serde_json::from_str(text).map_err(|e| StorageError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a raw `(key, text)` pair as returned by multi-get style APIs.
///
/// A pair without a value yields `None` so callers can skip it.
pub fn parse_entry<T: DeserializeOwned>(entry: (String, Option<String>)) -> StorageResult<Option<(String, T)>> {
    match entry {
        (key, Some(text)) => {
            let value = decode(&key, &text)?;
            Ok(Some((key, value)))
        }
        (_, None) => Ok(None),
    }
}
