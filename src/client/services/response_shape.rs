// Normalization of the list envelopes the backend wraps results in.
use crate::common::lenient;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Keys a list may hide under, checked in this order.
const LIST_KEYS: [&str; 5] = ["restaurants", "events", "data", "results", "items"];

/// Pulls the single canonical array out of a response.
///
/// Accepts a bare array, an array under one of [`LIST_KEYS`], an array under
/// `success.lists`, or any of those inside a `data` object. Anything else is
/// an empty list.
pub fn extract_array(res: &Value) -> Vec<Value> {
    if let Value::Array(items) = res {
        return items.clone();
    }
    for key in LIST_KEYS {
        if let Some(Value::Array(items)) = res.get(key) {
            return items.clone();
        }
    }
    if let Some(Value::Array(items)) = res.get("success").and_then(|s| s.get("lists")) {
        return items.clone();
    }
    match res.get("data") {
        Some(inner @ Value::Object(_)) => extract_array(inner),
        _ => Vec::new(),
    }
}

/// Deserializes every element of the extracted array, skipping the ones that
/// do not fit the model.
pub fn extract_list<T: DeserializeOwned>(res: &Value) -> Vec<T> {
    extract_array(res)
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// `{ data: {...} }` and `{ success: {...} }` envelopes around one record.
pub fn unwrap_record(res: &Value) -> &Value {
    for key in ["success", "data"] {
        if let Some(inner @ Value::Object(_)) = res.get(key) {
            return inner;
        }
        if let Some(inner @ Value::Array(_)) = res.get(key) {
            return inner;
        }
    }
    res
}

pub fn extract_total(res: &Value) -> Option<u64> {
    let candidates = [
        res.get("total"),
        res.get("totalCount"),
        res.get("count"),
        res.pointer("/pagination/total"),
        res.pointer("/success/total"),
        res.pointer("/success/pagination/total"),
        res.pointer("/data/pagination/total"),
        res.pointer("/data/total"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(lenient::value_to_id)
        .and_then(|n| u64::try_from(n).ok())
}

pub fn extract_has_next(res: &Value) -> Option<bool> {
    [
        res.get("hasNext"),
        res.get("has_next"),
        res.pointer("/success/hasNext"),
        res.pointer("/success/pagination/hasNext"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_bool)
}

/// First page number found among the usual pagination fields.
pub fn extract_number(res: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|k| if k.starts_with('/') { res.pointer(k) } else { res.get(*k) })
        .find_map(lenient::value_to_id)
        .and_then(|n| u64::try_from(n).ok())
}
