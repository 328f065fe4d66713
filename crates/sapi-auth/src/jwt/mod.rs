//! Token claims and the HS256 codec.
//!
//! # Modules
//!
//! - `codec` - compact JWS encoding/decoding with HMAC-SHA256

pub mod codec;

pub use codec::TokenCodec;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TokenError;

/// Subject claim
pub const CLAIM_SUB: &str = "sub";
/// Issued-at claim (unix seconds)
pub const CLAIM_IAT: &str = "iat";
/// Expiry claim (unix seconds)
pub const CLAIM_EXP: &str = "exp";
/// Not-before claim (unix seconds)
pub const CLAIM_NBF: &str = "nbf";
/// Issuer claim
pub const CLAIM_ISS: &str = "iss";
/// Scope list claim
pub const CLAIM_SCOPES: &str = "scopes";

/// Token claim set
///
/// An ordered map of claim name to JSON value. Registered claims have typed
/// accessors; anything else is reachable through [`Claims::get`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Empty claim set
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap an existing JSON object
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a claim
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Insert a claim only if it is not already present
    pub fn insert_default(&mut self, name: &str, value: impl FnOnce() -> Value) {
        if !self.0.contains_key(name) {
            self.0.insert(name.to_string(), value());
        }
    }

    /// Raw claim value
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether a claim is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of claims
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying map
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// `sub` as a string, if present and non-empty
    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.str_claim(CLAIM_SUB)
    }

    /// `iss` as a string, if present and non-empty
    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.str_claim(CLAIM_ISS)
    }

    /// `iat` in unix seconds
    #[must_use]
    pub fn iat(&self) -> Option<i64> {
        self.int_claim(CLAIM_IAT)
    }

    /// `exp` in unix seconds
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.int_claim(CLAIM_EXP)
    }

    /// `nbf` in unix seconds
    #[must_use]
    pub fn nbf(&self) -> Option<i64> {
        self.int_claim(CLAIM_NBF)
    }

    /// Normalized `scopes`; empty when the claim is absent
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.get(CLAIM_SCOPES)
            .map(crate::scopes::from_value)
            .unwrap_or_default()
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn int_claim(&self, name: &str) -> Option<i64> {
        self.time_claim(name).ok().flatten()
    }

    /// A unix-seconds claim; `Ok(None)` when absent
    ///
    /// Integers, finite in-range floats (truncated) and numeric strings are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] when the claim is present but is not a
    /// representable number of seconds.
    pub fn time_claim(&self, name: &str) -> Result<Option<i64>, TokenError> {
        let Some(value) = self.0.get(name) else {
            return Ok(None);
        };
        let seconds = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_seconds)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_seconds))
            }
            _ => None,
        };
        seconds.map(Some).ok_or(TokenError::Invalid)
    }
}

fn float_seconds(f: f64) -> Option<i64> {
    // i64::MAX is not exactly representable; 2^63 is the first value out of range
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let f = f.trunc();
    (f.is_finite() && f >= -LIMIT && f < LIMIT).then_some(f as i64)
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_accessors() {
        let claims = Claims::new()
            .with("sub", "alice")
            .with("iat", 100)
            .with("exp", "160")
            .with("nbf", 99.9)
            .with("scopes", "read, write");

        assert_eq!(claims.sub(), Some("alice"));
        assert_eq!(claims.iat(), Some(100));
        assert_eq!(claims.exp(), Some(160));
        assert_eq!(claims.nbf(), Some(99));
        assert_eq!(claims.scopes(), vec!["read", "write"]);
        assert!(claims.iss().is_none());
    }

    #[test]
    fn test_unreadable_time_claims_are_invalid() {
        let claims = Claims::new()
            .with("exp", "tomorrow")
            .with("nbf", 1e300)
            .with("iat", json!([1]));

        assert_eq!(claims.time_claim("exp"), Err(TokenError::Invalid));
        assert_eq!(claims.time_claim("nbf"), Err(TokenError::Invalid));
        assert_eq!(claims.time_claim("iat"), Err(TokenError::Invalid));
        assert_eq!(claims.time_claim("missing"), Ok(None));
        assert!(claims.exp().is_none());
    }

    #[test]
    fn test_insert_default_keeps_existing() {
        let mut claims = Claims::new().with("exp", 5);
        claims.insert_default("exp", || json!(10));
        claims.insert_default("iat", || json!(1));
        assert_eq!(claims.exp(), Some(5));
        assert_eq!(claims.iat(), Some(1));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let claims = Claims::new().with("sub", "bob");
        assert_eq!(serde_json::to_value(&claims).unwrap(), json!({"sub": "bob"}));
    }
}
