//! Size bounding for log payloads.
//!
//! A payload under its byte budget is kept as is. Over budget, strings are cut,
//! containers are capped and nesting is limited; if the result still does not
//! fit, only `{"_truncated": true}` remains.

use serde_json::{Map, Value, json};

/// Longest string kept, in characters
pub const MAX_STRING_CHARS: usize = 512;
/// Most entries kept per object or array
pub const MAX_ITEMS: usize = 50;
/// Deepest nesting kept
pub const MAX_DEPTH: usize = 6;

/// Marker on a payload that was cut
pub const TRUNCATED_KEY: &str = "_truncated";
/// Marker on a container that lost entries
pub const TRUNCATED_ITEMS_KEY: &str = "_truncated_items";

const ELLIPSIS: char = '…';

/// Serialized size of `value` in bytes
#[must_use]
pub fn encoded_len(value: &Value) -> usize {
    serde_json::to_vec(value).map_or(usize::MAX, |bytes| bytes.len())
}

/// Bound `value` to `max_bytes` of serialized JSON
///
/// Objects gain `_truncated: true` when cut. Other payloads are wrapped as
/// `{"value": ..., "_truncated": true}` so the marker has somewhere to go.
#[must_use]
pub fn bound(value: Value, max_bytes: usize) -> Value {
    if encoded_len(&value) <= max_bytes {
        return value;
    }

    let mut cut = match truncate(&value, MAX_DEPTH) {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    cut.insert(TRUNCATED_KEY.to_string(), Value::Bool(true));

    let cut = Value::Object(cut);
    if encoded_len(&cut) <= max_bytes {
        cut
    } else {
        collapsed()
    }
}

/// The payload left when nothing else fits
#[must_use]
pub fn collapsed() -> Value {
    json!({ TRUNCATED_KEY: true })
}

/// Cut strings and containers without regard to the byte budget
#[must_use]
pub fn truncate(value: &Value, depth: usize) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_str(s, MAX_STRING_CHARS)),
        Value::Object(map) => {
            if depth < 1 {
                return collapsed();
            }
            let mut out = Map::new();
            for (index, (key, item)) in map.iter().enumerate() {
                if index >= MAX_ITEMS {
                    out.insert(TRUNCATED_ITEMS_KEY.to_string(), Value::Bool(true));
                    break;
                }
                out.insert(key.clone(), truncate(item, depth - 1));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            if depth < 1 {
                return collapsed();
            }
            let mut out: Vec<Value> = items
                .iter()
                .take(MAX_ITEMS)
                .map(|item| truncate(item, depth - 1))
                .collect();
            if items.len() > MAX_ITEMS {
                out.push(json!({ TRUNCATED_ITEMS_KEY: true }));
            }
            Value::Array(out)
        }
        other => other.clone(),
    }
}

/// Keep at most `max_chars` characters, marking the cut with `…`
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => {
            let mut out = s[..end].to_string();
            out.push(ELLIPSIS);
            out
        }
        None => s.to_string(),
    }
}

/// Keep at most `max_bytes` bytes without splitting a character
#[must_use]
pub fn cut_at_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_small_payload_untouched() {
        let value = json!({"a": "b"});
        assert_eq!(bound(value.clone(), 100), value);
    }

    #[test]
    fn test_long_string_cut() {
        let value = json!({"text": "x".repeat(2000)});
        let out = bound(value, 1024);
        let text = out["text"].as_str().unwrap();
        assert_eq!(text.chars().count(), MAX_STRING_CHARS + 1);
        assert!(text.ends_with('…'));
        assert_eq!(out[TRUNCATED_KEY], true);
    }

    #[test]
    fn test_item_cap() {
        let map: Map<String, Value> = (0..80).map(|i| (format!("k{i:02}"), json!(i))).collect();
        let out = truncate(&Value::Object(map), MAX_DEPTH);
        let out = out.as_object().unwrap();
        assert_eq!(out.len(), MAX_ITEMS + 1);
        assert_eq!(out[TRUNCATED_ITEMS_KEY], true);

        let list = Value::Array((0..60).map(|i| json!(i)).collect());
        let out = truncate(&list, MAX_DEPTH);
        assert_eq!(out.as_array().unwrap().len(), MAX_ITEMS + 1);
    }

    #[test]
    fn test_depth_cap() {
        let mut value = json!("leaf");
        for _ in 0..10 {
            value = json!({ "n": value });
        }
        let mut out = truncate(&value, MAX_DEPTH);
        for _ in 0..MAX_DEPTH {
            out = out["n"].clone();
        }
        assert_eq!(out, collapsed());
    }

    #[test]
    fn test_collapse_when_still_too_big() {
        let map: Map<String, Value> = (0..40)
            .map(|i| (format!("k{i}"), json!("y".repeat(400))))
            .collect();
        assert_eq!(bound(Value::Object(map), 256), collapsed());
    }

    #[test]
    fn test_non_object_wrapped() {
        let out = bound(json!(["z".repeat(600)]), 600);
        assert_eq!(out[TRUNCATED_KEY], true);
        assert!(out["value"].is_array());
    }

    #[test]
    fn test_cut_at_boundary() {
        assert_eq!(cut_at_boundary("héllo", 2), "h");
        assert_eq!(cut_at_boundary("abc", 10), "abc");
    }

    proptest! {
        #[test]
        fn prop_bound_respects_budget(s in ".{0,3000}", budget in 32usize..4096) {
            let out = bound(json!({"s": s}), budget);
            prop_assert!(encoded_len(&out) <= budget);
        }
    }
}
