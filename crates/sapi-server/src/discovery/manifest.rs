//! Reading provider declarations out of manifest files
//!
//! Base manifests are lock-style documents whose `packages` and `packages-dev`
//! entries carry `extra.sapi.route_providers`. Override manifests declare
//! `extra.sapi.route_providers` at the root.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use super::normalize::normalize_descriptor;
use super::{DescriptorSource, RouteTable};

/// Parse a JSON manifest; missing, unreadable or malformed files yield `None`
pub fn read_manifest(path: &Path) -> Option<Value> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "manifest not readable");
            return None;
        }
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            debug!(path = %path.display(), "manifest is not a JSON object");
            None
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "manifest is not valid JSON");
            None
        }
    }
}

fn providers_of(value: &Value) -> &[Value] {
    value
        .pointer("/extra/sapi/route_providers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Raw provider entries declared by packages in a base manifest
pub fn base_entries(manifest: &Value) -> impl Iterator<Item = &Value> {
    ["packages", "packages-dev"]
        .into_iter()
        .filter_map(|section| manifest.get(section).and_then(Value::as_array))
        .flatten()
        .flat_map(providers_of)
}

/// Raw provider entries declared at the root of an override manifest
pub fn override_entries(manifest: &Value) -> impl Iterator<Item = &Value> {
    providers_of(manifest).iter()
}

/// Normalize `entries` into a table; the first entry per key wins
pub fn collect<'a>(
    entries: impl IntoIterator<Item = &'a Value>,
    global_version: &str,
    source: DescriptorSource,
) -> RouteTable {
    let mut table = RouteTable::new();
    for entry in entries {
        let Some(descriptor) = normalize_descriptor(entry, global_version, source) else {
            continue;
        };
        table.entry(descriptor.key()).or_insert(descriptor);
    }
    table
}
