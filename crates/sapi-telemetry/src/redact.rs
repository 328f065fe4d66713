//! Key-based redaction of log payloads.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

/// Replacement for redacted values
pub const MASK: &str = "***";

/// Masks values stored under sensitive keys
///
/// Keys are compared lower-cased. Structured payloads are walked recursively;
/// raw text falls back to a `"key": "value"` pattern per key.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    keys: HashSet<String>,
    raw_patterns: Vec<Regex>,
}

impl Redactor {
    /// Build a redactor for the given keys (blank keys are ignored)
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: HashSet<String> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let mut sorted: Vec<&String> = keys.iter().collect();
        sorted.sort();
        let raw_patterns = sorted
            .into_iter()
            .filter_map(|key| {
                Regex::new(&format!(r#"(?i)("{}"\s*:\s*)"(.*?)""#, regex::escape(key))).ok()
            })
            .collect();

        Self { keys, raw_patterns }
    }

    /// Whether `key` is redacted
    #[must_use]
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.keys.contains(&key.to_lowercase())
    }

    /// Redacted copy of `value`
    #[must_use]
    pub fn redact(&self, value: &Value) -> Value {
        let mut out = value.clone();
        self.redact_in_place(&mut out);
        out
    }

    /// Redact `value` in place
    pub fn redact_in_place(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, item) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *item = Value::String(MASK.to_string());
                    } else {
                        self.redact_in_place(item);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.redact_in_place(item);
                }
            }
            _ => {}
        }
    }

    /// Redact `"key": "value"` pairs in unparsed text
    #[must_use]
    pub fn redact_raw(&self, raw: &str) -> String {
        self.raw_patterns
            .iter()
            .fold(raw.to_string(), |text, pattern| {
                pattern.replace_all(&text, "${1}\"***\"").into_owned()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn redactor() -> Redactor {
        Redactor::new(["password", "Token", " "])
    }

    #[test]
    fn test_recursive_redaction() {
        let input = json!({"password": "x", "nested": {"token": "y", "keep": 1}});
        assert_eq!(
            redactor().redact(&input),
            json!({"password": "***", "nested": {"token": "***", "keep": 1}})
        );
    }

    #[test]
    fn test_keys_case_insensitive_and_arrays_walked() {
        let input = json!([{"PASSWORD": {"deep": true}}, "password", 3]);
        assert_eq!(
            redactor().redact(&input),
            json!([{"PASSWORD": "***"}, "password", 3])
        );
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let input = json!({"password": "x", "list": [{"token": "t"}]});
        let once = redactor().redact(&input);
        assert_eq!(redactor().redact(&once), once);
    }

    #[test]
    fn test_raw_redaction() {
        let raw = r#"{"username":"a","Password" : "hunter2","token":"t", "other":"v""#;
        assert_eq!(
            redactor().redact_raw(raw),
            r#"{"username":"a","Password" : "***","token":"***", "other":"v""#
        );
    }

    #[test]
    fn test_empty_redactor_is_noop() {
        let input = json!({"password": "x"});
        assert_eq!(Redactor::default().redact(&input), input);
        assert_eq!(Redactor::default().redact_raw("a"), "a");
    }
}
