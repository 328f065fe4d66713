//! Configured route definitions
//!
//! Route definitions in configuration come in several shapes:
//!
//! ```toml
//! [routes]
//! "GET orders" = "App\\Orders@index"            # shorthand, action string
//! "POST orders" = { middleware = "sapi.jwt" }  # shorthand, table merged over method/path
//!
//! [routes.health]                              # named table
//! method = "get"
//! path = "health"
//! action = ["App\\Health", "show"]
//! ```
//!
//! or an array of tables. All of them normalize into [`ConfiguredRoute`] before
//! anything else looks at them.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Methods a configured route may use
pub const ALLOWED_METHODS: [&str; 7] = ["get", "post", "put", "patch", "delete", "options", "head"];

/// Handler shown when a definition has no usable action
pub const MISSING_HANDLER: &str = "Not present";

/// One normalized route definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfiguredRoute {
    /// Upper-case HTTP method
    pub method: String,
    /// Absolute path including base path and prefix
    pub path: String,
    /// `Class@method` handler id
    pub handler: String,
    /// Middleware names
    pub middleware: Vec<String>,
    /// Normalization notes
    pub notes: Vec<String>,
    /// Group prefix as configured
    pub prefix: String,
    /// Whether a JWT middleware guards the route
    pub protected: bool,
    /// Route name, if configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Counts over the normalized routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    /// Base path without slashes
    pub base_path: String,
    /// Number of routes
    pub total: usize,
    /// Routes behind a JWT middleware
    pub protected: usize,
    /// Remaining routes
    pub public: usize,
}

/// Normalized routes and their summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfiguredRoutes {
    /// Routes sorted by path, then method
    pub routes: Vec<ConfiguredRoute>,
    /// Counts
    pub summary: RouteSummary,
}

/// Normalize the `routes` configuration value against `base_path`
#[must_use]
pub fn normalize_routes(config: &Value, base_path: &str) -> ConfiguredRoutes {
    let base_path = base_path.trim().trim_matches('/').to_string();

    let mut routes: Vec<ConfiguredRoute> = definitions(config)
        .iter()
        .filter_map(|definition| normalize_definition(definition, &base_path))
        .collect();
    routes.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));

    let protected = routes.iter().filter(|r| r.protected).count();
    let summary = RouteSummary {
        base_path,
        total: routes.len(),
        protected,
        public: routes.len() - protected,
    };
    ConfiguredRoutes { routes, summary }
}

fn shorthand_pattern() -> &'static Regex {
    static SHORTHAND_RE: OnceLock<Regex> = OnceLock::new();
    SHORTHAND_RE.get_or_init(|| {
        Regex::new(r"(?i)^(GET|POST|PUT|PATCH|DELETE|OPTIONS|HEAD)\s+(.+)$").unwrap()
    })
}

/// Split a `"METHOD path"` key
fn shorthand(key: &str) -> Option<(String, String)> {
    let caps = shorthand_pattern().captures(key.trim())?;
    Some((caps[1].to_lowercase(), caps[2].trim().to_string()))
}

/// Flatten every supported shape into plain definition tables
fn definitions(config: &Value) -> Vec<Map<String, Value>> {
    match config {
        Value::Array(items) => items.iter().filter_map(|v| v.as_object().cloned()).collect(),
        Value::Object(entries) => entries
            .iter()
            .filter_map(|(key, value)| match (shorthand(key), value) {
                (Some((method, path)), Value::String(action)) => {
                    let mut definition = Map::new();
                    definition.insert("method".into(), Value::String(method));
                    definition.insert("path".into(), Value::String(path));
                    definition.insert("action".into(), Value::String(action.clone()));
                    Some(definition)
                }
                (Some((method, path)), Value::Object(table)) => {
                    let mut definition = Map::new();
                    definition.insert("method".into(), Value::String(method));
                    definition.insert("path".into(), Value::String(path));
                    definition.extend(table.clone());
                    Some(definition)
                }
                (None, Value::Object(table)) => {
                    let mut definition = table.clone();
                    definition
                        .entry("name")
                        .or_insert_with(|| Value::String(key.clone()));
                    Some(definition)
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn normalize_definition(definition: &Map<String, Value>, base_path: &str) -> Option<ConfiguredRoute> {
    let method = text(definition.get("method")).to_lowercase();
    if !ALLOWED_METHODS.contains(&method.as_str()) {
        return None;
    }

    let path = text(definition.get("path"));
    let path = path.trim().trim_matches('/');
    if path.is_empty() {
        return None;
    }

    let prefix = text(definition.get("prefix"));
    let prefix = prefix.trim().trim_matches('/').to_string();
    let middleware = normalize_middleware(definition.get("middleware"));

    let mut notes = Vec::new();
    let handler = normalize_handler(definition.get("action"), &mut notes)
        .unwrap_or_else(|| MISSING_HANDLER.to_string());

    let prefix_in_base = !prefix.is_empty()
        && (base_path == prefix || base_path.ends_with(&format!("/{prefix}")));
    if prefix_in_base {
        notes.push("prefix dedup applied".to_string());
    }

    let segments = [
        base_path,
        if prefix_in_base { "" } else { prefix.as_str() },
        path,
    ];
    let full_path = segments
        .iter()
        .filter(|s| !s.is_empty())
        .fold(String::new(), |mut acc, s| {
            acc.push('/');
            acc.push_str(s);
            acc
        });

    let protected = middleware
        .iter()
        .any(|m| m.to_lowercase().contains("jwt"));

    let name = definition
        .get("name")
        .map(|v| text(Some(v)))
        .filter(|n| !n.is_empty());

    Some(ConfiguredRoute {
        method: method.to_uppercase(),
        path: full_path,
        handler,
        middleware,
        notes,
        prefix,
        protected,
        name,
    })
}

fn normalize_middleware(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| text(Some(item)))
            .filter(|m| !m.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn normalize_handler(action: Option<&Value>, notes: &mut Vec<String>) -> Option<String> {
    match action? {
        Value::Array(parts) => match parts.as_slice() {
            [Value::String(class), Value::String(method)] => Some(format!("{class}@{method}")),
            _ => None,
        },
        Value::String(action) if action.contains('@') => Some(action.clone()),
        Value::String(action) => {
            notes.push("invokable".to_string());
            Some(format!("{action}@__invoke"))
        }
        _ => None,
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
