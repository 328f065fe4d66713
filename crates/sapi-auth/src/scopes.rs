//! Flat scope model.
//!
//! Scopes are plain string labels. `"*"` grants everything. A scope claim may
//! arrive as a comma-separated string or as a JSON array; both normalize to an
//! ordered, de-duplicated list of trimmed, non-empty labels.

use serde_json::Value;

/// Scope granting unrestricted access
pub const WILDCARD_SCOPE: &str = "*";

/// Normalize a scope claim value
///
/// Strings are split on `,`; arrays contribute their string and numeric
/// elements. Everything else yields an empty list.
pub fn from_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => parse_list(s),
        Value::Array(items) => dedup(items.iter().filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })),
        _ => Vec::new(),
    }
}

/// Split a comma-separated scope string
pub fn parse_list(raw: &str) -> Vec<String> {
    dedup(raw.split(',').map(|s| s.trim().to_string()))
}

/// Normalize scopes for issuance: empty or invalid input becomes `["*"]`
pub fn for_issue(value: Option<&Value>) -> Vec<String> {
    let scopes = value.map(from_value).unwrap_or_default();
    if scopes.is_empty() {
        vec![WILDCARD_SCOPE.to_string()]
    } else {
        scopes
    }
}

/// Whether `token_scopes` satisfy `required`
///
/// True when the token carries the wildcard, when nothing is required, or when
/// every required scope is present.
pub fn allow<T, R>(token_scopes: &[T], required: &[R]) -> bool
where
    T: AsRef<str>,
    R: AsRef<str>,
{
    if required.is_empty() {
        return true;
    }
    if token_scopes.iter().any(|s| s.as_ref() == WILDCARD_SCOPE) {
        return true;
    }
    required
        .iter()
        .all(|r| token_scopes.iter().any(|s| s.as_ref() == r.as_ref()))
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_comma_string() {
        assert_eq!(parse_list(" read, write ,,read "), vec!["read", "write"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_from_value_shapes() {
        assert_eq!(from_value(&json!(["a", " b ", 3, null])), vec!["a", "b", "3"]);
        assert_eq!(from_value(&json!("x,y")), vec!["x", "y"]);
        assert!(from_value(&json!({"a": 1})).is_empty());
        assert!(from_value(&json!(true)).is_empty());
    }

    #[test]
    fn test_issue_default_is_wildcard() {
        assert_eq!(for_issue(None), vec!["*"]);
        assert_eq!(for_issue(Some(&json!([]))), vec!["*"]);
        assert_eq!(for_issue(Some(&json!(""))), vec!["*"]);
        assert_eq!(for_issue(Some(&json!(42))), vec!["*"]);
        assert_eq!(for_issue(Some(&json!("read"))), vec!["read"]);
    }

    #[test]
    fn test_allow_rules() {
        let none: [&str; 0] = [];
        assert!(allow(&["read"], &none));
        assert!(allow(&none, &none));
        assert!(allow(&["*"], &["write", "admin"]));
        assert!(allow(&["read", "write"], &["write"]));
        assert!(!allow(&["read"], &["write"]));
        assert!(!allow(&none, &["read"]));
    }

    fn scope() -> impl Strategy<Value = String> {
        "[a-z]{1,6}"
    }

    proptest! {
        #[test]
        fn prop_wildcard_allows_anything(required in prop::collection::vec(scope(), 0..8)) {
            prop_assert!(allow(&["*"], &required));
        }

        #[test]
        fn prop_allow_is_subset_check(
            token in prop::collection::vec(scope(), 0..8),
            required in prop::collection::vec(scope(), 0..8),
        ) {
            let subset = required.iter().all(|r| token.contains(r));
            prop_assert_eq!(allow(&token, &required), subset);
        }
    }
}
