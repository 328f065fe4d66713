//! Descriptor normalization

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::{DescriptorSource, RouteDescriptor};

fn endpoint_pattern() -> &'static Regex {
    static ENDPOINT_RE: OnceLock<Regex> = OnceLock::new();
    ENDPOINT_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*$").unwrap())
}

fn version_pattern() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").unwrap())
}

/// Trim, strip slashes and check a version segment; invalid input becomes `""`
#[must_use]
pub fn normalize_version(raw: &str) -> String {
    let version = raw.trim().trim_matches('/');
    if version_pattern().is_match(version) {
        version.to_string()
    } else {
        String::new()
    }
}

/// Trim, strip slashes and lower-case an endpoint; `None` unless path-safe
#[must_use]
pub fn normalize_endpoint(raw: &str) -> Option<String> {
    let endpoint = raw.trim().trim_matches('/').to_lowercase();
    if endpoint.is_empty() || endpoint.chars().any(char::is_whitespace) {
        return None;
    }
    endpoint_pattern().is_match(&endpoint).then_some(endpoint)
}

/// Build a descriptor from one raw manifest entry
///
/// Entries without a `version` key take `global_version`; an explicit empty or
/// invalid version leaves the descriptor unversioned.
#[must_use]
pub fn normalize_descriptor(
    raw: &Value,
    global_version: &str,
    source: DescriptorSource,
) -> Option<RouteDescriptor> {
    let entry = raw.as_object()?;

    let class = entry.get("class").map(scalar_string).unwrap_or_default();
    let class = class.trim();
    if class.is_empty() {
        return None;
    }

    let endpoint = normalize_endpoint(&entry.get("endpoint").map(scalar_string).unwrap_or_default())?;

    let version = match entry.get("version") {
        Some(value) => normalize_version(&scalar_string(value)),
        None => global_version.to_string(),
    };

    Some(RouteDescriptor {
        class: class.to_string(),
        endpoint,
        version,
        source,
    })
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        _ => String::new(),
    }
}
