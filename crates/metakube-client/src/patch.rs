//! JSON merge patches (RFC 7386)
//!
//! Request bodies leave empty fields out, so a patch built from the desired
//! body alone cannot clear anything. [`diff`] compares the body that produced
//! the current object with the desired one and emits `null` for every member
//! that disappeared.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::ApiResult;
use crate::error::ApiError;

/// Merge patch turning `from` into `to`
///
/// Objects are compared member by member; anything else, arrays included, is
/// replaced wholesale. Members equal on both sides are left out, so an
/// unchanged document yields an empty object.
pub fn diff(from: &Value, to: &Value) -> Value {
    match (from, to) {
        (Value::Object(from), Value::Object(to)) => {
            let mut patch = Map::new();
            for key in from.keys().filter(|k| !to.contains_key(*k)) {
                patch.insert(key.clone(), Value::Null);
            }
            for (key, value) in to {
                match from.get(key) {
                    Some(old) if old == value => {}
                    Some(old) => {
                        patch.insert(key.clone(), diff(old, value));
                    }
                    None => {
                        patch.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(patch)
        }
        _ => to.clone(),
    }
}

/// [`diff`] of two serializable bodies
pub fn diff_bodies<T: Serialize>(operation: &'static str, from: &T, to: &T) -> ApiResult<Value> {
    let encode = |body: &T| {
        serde_json::to_value(body).map_err(|source| ApiError::Encode { operation, source })
    };
    Ok(diff(&encode(from)?, &encode(to)?))
}

/// True for a patch that changes nothing
pub fn is_empty(patch: &Value) -> bool {
    matches!(patch, Value::Object(members) if members.is_empty())
}

/// Apply a merge patch to `target` in place
pub fn apply(target: &mut Value, patch: &Value) {
    let Value::Object(members) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(object) = target {
        for (key, value) in members {
            if value.is_null() {
                object.remove(key);
            } else {
                apply(object.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
