//! JSON merge patch (RFC 7386) over serializable sections.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;

/// Merge `patch` into `target`. `null` members delete keys; non-object
/// patches replace the target.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(members) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in members {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// `current` with `patch` merged in. A result that no longer fits the type
/// is a validation error.
pub fn apply_patch<T>(current: &T, patch: &Value) -> Result<T, Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut doc = serde_json::to_value(current).map_err(|e| Error::Internal(e.to_string()))?;
    merge_patch(&mut doc, patch);
    serde_json::from_value(doc).map_err(|e| Error::validation(format!("invalid configuration: {}", e)))
}
