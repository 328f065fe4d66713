//! Gateway middleware behaviour
//!
//! Exercises every terminal state of the gateway through a real tower stack.

mod common;

use common::{SECRET, bearer, body_json, config, echo_identity, expired_token, token_with_scopes};
use pretty_assertions::assert_eq;
use sapi_auth::{AuthConfig, AuthGatewayLayer, Claims, TokenCodec};
use sapi_core::RequestContext;
use serde_json::json;
use tower::{Layer, ServiceExt, service_fn};

fn request(authorization: Option<&str>) -> http::Request<String> {
    let mut builder = http::Request::builder().uri("/api/v1/whoami");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(String::new()).unwrap()
}

async fn call(layer: AuthGatewayLayer, req: http::Request<String>) -> http::Response<String> {
    layer.layer(service_fn(echo_identity)).oneshot(req).await.unwrap()
}

#[tokio::test]
async fn test_missing_header_is_401() {
    let response = call(AuthGatewayLayer::new(&config()), request(None)).await;

    assert_eq!(response.status(), 401);
    assert_eq!(
        body_json(&response),
        json!({"success": false, "message": "Unauthorized.", "object": {}, "code": 401})
    );
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_blank_bearer_is_401() {
    let response = call(AuthGatewayLayer::new(&config()), request(Some("Bearer    "))).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_scheme_is_case_insensitive() {
    let token = token_with_scopes("bob", &["read"]);
    let response = call(
        AuthGatewayLayer::new(&config()),
        request(Some(&format!("bearer {token}"))),
    )
    .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_missing_secret_is_500() {
    // GIVEN: a gateway without a secret and an otherwise valid token
    let token = token_with_scopes("bob", &["read"]);
    let response = call(
        AuthGatewayLayer::new(&AuthConfig::default()),
        request(Some(&bearer(&token))),
    )
    .await;

    // THEN: misconfiguration, not an auth failure
    assert_eq!(response.status(), 500);
    assert_eq!(body_json(&response)["message"], "Server misconfigured.");
}

#[tokio::test]
async fn test_expired_and_forged_are_indistinguishable() {
    let expired = call(
        AuthGatewayLayer::new(&config()),
        request(Some(&bearer(&expired_token("bob")))),
    )
    .await;

    let forged = TokenCodec::new("not-the-secret")
        .encode(&Claims::new().with("sub", "bob"))
        .unwrap();
    let forged = call(AuthGatewayLayer::new(&config()), request(Some(&bearer(&forged)))).await;

    assert_eq!(expired.status(), forged.status());
    assert_eq!(expired.body(), forged.body());
}

#[tokio::test]
async fn test_identity_written_to_context() {
    // GIVEN: a context installed upstream
    let ctx = RequestContext::with_request_id("req-1");
    let mut req = request(Some(&bearer(&token_with_scopes("carol", &["read", "write"]))));
    req.extensions_mut().insert(ctx.clone());

    // WHEN
    let response = call(AuthGatewayLayer::new(&config()).require_scope("read"), req).await;

    // THEN: the upstream handle observes the writes
    assert_eq!(response.status(), 200);
    assert_eq!(ctx.sub().as_deref(), Some("carol"));
    assert_eq!(ctx.scopes(), vec!["read", "write"]);
    assert_eq!(body_json(&response)["claims_cached"], true);
}

#[tokio::test]
async fn test_cached_claims_skip_decoding_but_not_scopes() {
    // GIVEN: claims already verified earlier in the request and no header
    let mut req = request(None);
    req.extensions_mut()
        .insert(Claims::new().with("sub", "dave").with("scopes", json!(["read"])));

    // WHEN: a gateway with no scope requirement runs
    let ok = call(AuthGatewayLayer::new(&config()), req).await;
    // THEN: accepted without a token
    assert_eq!(ok.status(), 200);
    assert_eq!(body_json(&ok)["sub"], "dave");

    // WHEN: a gateway requiring write runs on the same kind of request
    let mut req = request(None);
    req.extensions_mut()
        .insert(Claims::new().with("sub", "dave").with("scopes", json!(["read"])));
    let denied = call(AuthGatewayLayer::new(&config()).require_scope("write"), req).await;
    // THEN: scopes are still enforced
    assert_eq!(denied.status(), 403);
}

#[tokio::test]
async fn test_token_without_scopes_has_none() {
    let token = TokenCodec::new(SECRET)
        .encode(&Claims::new().with("sub", "erin"))
        .unwrap();

    let open = call(AuthGatewayLayer::new(&config()), request(Some(&bearer(&token)))).await;
    assert_eq!(open.status(), 200);
    assert_eq!(body_json(&open)["scopes"], json!([]));

    let scoped = call(
        AuthGatewayLayer::new(&config()).require_scope("read"),
        request(Some(&bearer(&token))),
    )
    .await;
    assert_eq!(scoped.status(), 403);
}
