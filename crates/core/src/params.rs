//! Lenient typed lookups into a `serde_json::Value` configuration object.
//!
//! Each helper falls back to the supplied default when the key is missing or
//! holds the wrong JSON type, so a partial config object always yields a
//! complete configuration. Range checks happen later, in validation.

use serde_json::Value;
use std::collections::BTreeMap;

/// Reads `params[name]` as `f64` (integers accepted).
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Reads `params[name]` as an optional `f64`; an explicit `null` clears the default.
pub fn param_opt_f64(params: &Value, name: &str, default: Option<f64>) -> Option<f64> {
    match params.get(name) {
        Some(Value::Null) => None,
        Some(v) => v.as_f64().or(default),
        None => default,
    }
}

/// Reads `params[name]` as a non-negative integer.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

pub fn param_u64(params: &Value, name: &str, default: u64) -> u64 {
    params.get(name).and_then(Value::as_u64).unwrap_or(default)
}

pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Reads `params[name]` as a map of attribute name to numeric bound.
///
/// Entries with non-numeric values are skipped. A missing key or non-object
/// value yields an empty map.
pub fn param_bounds(params: &Value, name: &str) -> BTreeMap<String, f64> {
    params
        .get(name)
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_f64().map(|b| (k.clone(), b)))
                .collect()
        })
        .unwrap_or_default()
}
