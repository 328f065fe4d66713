//! Common test utilities for integration tests
//!
//! Shared configuration, token minting and a trivial protected service used by
//! the lifecycle and middleware suites.

#![allow(dead_code)]

use std::convert::Infallible;

use sapi_auth::{AuthConfig, Claims, TokenIssuer};
use sapi_core::RequestContext;
use serde_json::{Value, json};

/// Secret shared by every suite
pub const SECRET: &str = "integration-test-secret";

/// Auth config with the shared secret and a one minute ttl
pub fn config() -> AuthConfig {
    AuthConfig::builder().secret(SECRET).ttl_seconds(60).build()
}

/// Issue a token for `sub` carrying `scopes`
pub fn token_with_scopes(sub: &str, scopes: &[&str]) -> String {
    TokenIssuer::new(config())
        .issue(sub, Claims::new().with("scopes", json!(scopes)), None)
        .expect("issue token")
}

/// Issue a token whose `exp` is already in the past
pub fn expired_token(sub: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    TokenIssuer::new(config())
        .issue(
            sub,
            Claims::new().with("iat", now - 120).with("exp", now - 60),
            None,
        )
        .expect("issue token")
}

/// `Authorization` header value for `token`
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Inner service that echoes the identity the gateway recorded
pub async fn echo_identity(req: http::Request<String>) -> Result<http::Response<String>, Infallible> {
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    let body = json!({
        "sub": ctx.sub(),
        "scopes": ctx.scopes(),
        "claims_cached": req.extensions().get::<Claims>().is_some(),
    });
    Ok(http::Response::new(body.to_string()))
}

/// Parse a response body as JSON
pub fn body_json(response: &http::Response<String>) -> Value {
    serde_json::from_str(response.body()).expect("json body")
}
