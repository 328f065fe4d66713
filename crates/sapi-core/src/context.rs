//! Request-scoped context shared across the middleware stack.
//!
//! [`RequestContext`] is a cheap-clone handle. The access-log layer creates one
//! per inbound request and stores it in the request extensions; the auth
//! gateway and handlers write identity fields into it, and the logging pipeline
//! reads it once the response is known.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Extensions;
use parking_lot::RwLock;
use serde_json::{Map, Value};

/// Well-known context keys
pub mod keys {
    /// Correlation id (mirrors the `X-Request-Id` header)
    pub const REQUEST_ID: &str = "request_id";
    /// Caller IP address
    pub const IP: &str = "ip";
    /// Resolved route identifier
    pub const ROUTE: &str = "route";
    /// Authenticated subject
    pub const SUB: &str = "sub";
    /// Normalized token scopes
    pub const SCOPES: &str = "scopes";
    /// Local user id resolved by a handler
    pub const USER_ID: &str = "user_id";
}

/// Per-request key/value bag
///
/// Every clone of a context points at the same storage, so a value written by
/// the auth gateway is visible to the access logger of the same request. Two
/// different requests never share a context.
#[derive(Clone)]
pub struct RequestContext {
    values: Arc<RwLock<Map<String, Value>>>,
    started: Instant,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("values", &*self.values.read())
            .field("elapsed", &self.started.elapsed())
            .finish()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Arc::new(RwLock::new(Map::new())),
            started: Instant::now(),
        }
    }

    /// Create a context with the given request id already set
    pub fn with_request_id(id: impl Into<String>) -> Self {
        let ctx = Self::new();
        ctx.set_request_id(id);
        ctx
    }

    /// Return the context stored in `extensions`, installing a fresh one if absent
    pub fn from_extensions_or_insert(extensions: &mut Extensions) -> Self {
        if let Some(ctx) = extensions.get::<Self>() {
            return ctx.clone();
        }
        let ctx = Self::new();
        extensions.insert(ctx.clone());
        ctx
    }

    /// Set an arbitrary key
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Read an arbitrary key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Remove a key, returning its previous value
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().remove(key)
    }

    /// Copy of every key currently set
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.read().clone()
    }

    /// Time since the context was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether two handles point at the same request
    #[must_use]
    pub fn same_request(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    fn get_str(&self, key: &str) -> Option<String> {
        match self.values.read().get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Correlation id
    #[must_use]
    pub fn request_id(&self) -> Option<String> {
        self.get_str(keys::REQUEST_ID)
    }

    /// Set the correlation id
    pub fn set_request_id(&self, id: impl Into<String>) {
        self.set(keys::REQUEST_ID, id.into());
    }

    /// Caller IP address
    #[must_use]
    pub fn ip(&self) -> Option<String> {
        self.get_str(keys::IP)
    }

    /// Set the caller IP address
    pub fn set_ip(&self, ip: impl Into<String>) {
        self.set(keys::IP, ip.into());
    }

    /// Resolved route identifier
    #[must_use]
    pub fn route(&self) -> Option<String> {
        self.get_str(keys::ROUTE)
    }

    /// Set the resolved route identifier
    pub fn set_route(&self, route: impl Into<String>) {
        self.set(keys::ROUTE, route.into());
    }

    /// Authenticated subject
    #[must_use]
    pub fn sub(&self) -> Option<String> {
        self.get_str(keys::SUB)
    }

    /// Set the authenticated subject
    pub fn set_sub(&self, sub: impl Into<String>) {
        self.set(keys::SUB, sub.into());
    }

    /// Token scopes; empty when unauthenticated
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        match self.values.read().get(keys::SCOPES) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Set the token scopes
    pub fn set_scopes<I, S>(&self, scopes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = scopes
            .into_iter()
            .map(|s| Value::String(s.into()))
            .collect();
        self.set(keys::SCOPES, Value::Array(list));
    }

    /// Local user id
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.get_str(keys::USER_ID)
    }

    /// Set the local user id
    pub fn set_user_id(&self, user_id: impl Into<Value>) {
        self.set(keys::USER_ID, user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clones_share_state() {
        let ctx = RequestContext::new();
        let other = ctx.clone();
        ctx.set_sub("alice");
        ctx.set_scopes(["read", "write"]);

        assert_eq!(other.sub().as_deref(), Some("alice"));
        assert_eq!(other.scopes(), vec!["read", "write"]);
        assert!(ctx.same_request(&other));
    }

    #[test]
    fn test_fresh_contexts_are_isolated() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        a.set_sub("alice");

        assert!(b.sub().is_none());
        assert!(!a.same_request(&b));
    }

    #[test]
    fn test_user_id_accepts_numbers() {
        let ctx = RequestContext::new();
        ctx.set_user_id(42);
        assert_eq!(ctx.user_id().as_deref(), Some("42"));
        assert_eq!(ctx.get("user_id"), Some(json!(42)));
    }

    #[test]
    fn test_empty_strings_read_as_absent() {
        let ctx = RequestContext::new();
        ctx.set_route("");
        assert!(ctx.route().is_none());
    }

    #[test]
    fn test_from_extensions_reuses_existing() {
        let mut ext = Extensions::new();
        let first = RequestContext::from_extensions_or_insert(&mut ext);
        first.set_request_id("abc");

        let second = RequestContext::from_extensions_or_insert(&mut ext);
        assert!(first.same_request(&second));
        assert_eq!(second.request_id().as_deref(), Some("abc"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let ctx = RequestContext::with_request_id("r1");
        let snap = ctx.snapshot();
        ctx.set_sub("bob");

        assert_eq!(snap.get("request_id"), Some(&json!("r1")));
        assert!(!snap.contains_key("sub"));
    }
}
