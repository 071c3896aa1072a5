//! Wire-message decoding: turns a raw streaming frame's `content` items into
//! loosely-typed intermediate entities, tolerant of both the legacy
//! UPPER_SNAKE_CASE field names and the modern camelCase ones the upstream
//! has used interchangeably across protocol versions.
//!
//! Grounded on `axiom/mdata/streaming.py`'s `_extract_l1_entities` /
//! `_extract_l2_entities` / `_extract_chart_entities`. Deliberately stops
//! short of producing [`crate::entities`] rows: symbol resolution and price
//! scaling happen in [`crate::flush`], which is where a row first needs a
//! security id.

pub mod chart;
pub mod l1;
pub mod l2;

use serde_json::Value;

/// Extract the list of per-instrument items from a raw streaming frame.
///
/// Upstream frames come in several shapes: the envelope
/// `{"data": [{"service": ..., "content": [...]}, ...]}` the session hands
/// decoders, a bare `{"content": [...]}` or `{"content": {...}}` (a single
/// item, not wrapped in a list), a bare list, or a bare single object. All
/// normalize to a `Vec<&Value>`.
pub fn frame_items(msg: &Value) -> Vec<&Value> {
    if let Some(data) = msg.get("data").and_then(Value::as_array) {
        return data.iter().flat_map(content_items).collect();
    }
    content_items(msg)
}

/// Pull the `content` items out of one envelope entry (or the bare message
/// itself, when it has no `data` wrapper).
fn content_items(msg: &Value) -> Vec<&Value> {
    if let Some(content) = msg.get("content").filter(|c| !c.is_null()) {
        return match content {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
    }
    match msg {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![msg],
        _ => Vec::new(),
    }
}

/// Look up the first present key among `keys` and coerce it to `f64`.
/// Mirrors the original's permissive `_num(*keys)` helper: numeric strings
/// parse, non-numeric values are treated as absent rather than an error.
pub(crate) fn first_number(item: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(v) = item.get(*key) {
            if v.is_null() {
                continue;
            }
            if let Some(n) = v.as_f64() {
                return Some(n);
            }
            if let Some(s) = v.as_str() {
                if let Ok(n) = s.parse::<f64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}

/// Look up the first present key among `keys` and coerce it to `String`.
pub(crate) fn first_string(item: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = item.get(*key) {
            if let Some(s) = v.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frame_items_unwraps_content_list() {
        let msg = json!({ "content": [{"a": 1}, {"a": 2}] });
        assert_eq!(frame_items(&msg).len(), 2);
    }

    #[test]
    fn frame_items_unwraps_single_content_object() {
        let msg = json!({ "content": {"a": 1} });
        assert_eq!(frame_items(&msg).len(), 1);
    }

    #[test]
    fn frame_items_accepts_bare_list_and_object() {
        assert_eq!(frame_items(&json!([{"a": 1}])).len(), 1);
        assert_eq!(frame_items(&json!({"a": 1})).len(), 1);
        assert_eq!(frame_items(&json!(null)).len(), 0);
    }

    #[test]
    fn frame_items_descends_into_data_wrapped_envelope() {
        let msg = json!({
            "data": [{
                "service": "LEVELONE_EQUITY",
                "content": [{"a": 1}, {"a": 2}],
            }],
        });
        assert_eq!(frame_items(&msg).len(), 2);
    }

    #[test]
    fn frame_items_flattens_content_across_multiple_data_entries() {
        let msg = json!({
            "data": [
                {"service": "LEVELONE_EQUITY", "content": [{"a": 1}]},
                {"service": "LEVELONE_EQUITY", "content": [{"a": 2}, {"a": 3}]},
            ],
        });
        assert_eq!(frame_items(&msg).len(), 3);
    }

    #[test]
    fn first_number_prefers_earlier_key_and_parses_strings() {
        let item = json!({"BID_PRICE": "12.5", "bidPrice": 99.0});
        assert_eq!(first_number(&item, &["bidPrice", "BID_PRICE"]), Some(99.0));
        assert_eq!(first_number(&item, &["missing", "BID_PRICE"]), Some(12.5));
    }
}
