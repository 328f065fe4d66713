//! Token lifecycle integration tests
//!
//! Walks a token from issuance through verification, expiry and scope checks:
//! - Issue for `alice` with a one minute ttl and verify it immediately
//! - Reject once `exp` has passed
//! - Scope `read` cannot reach a route requiring `write`; `*` can

mod common;

use common::{SECRET, bearer, body_json, config, echo_identity, expired_token, token_with_scopes};
use sapi_auth::{
    AuthError, AuthGatewayLayer, ClaimValidator, Claims, TokenCodec, TokenError, TokenIssuer,
};
use tower::{Layer, ServiceExt, service_fn};

#[test]
fn test_issue_then_verify() {
    // GIVEN: an issuer with ttl=60
    let issuer = TokenIssuer::new(config());

    // WHEN: a token is issued for alice and decoded with the same secret
    let token = issuer.issue("alice", Claims::new(), None).unwrap();
    let claims = TokenCodec::new(SECRET).decode(&token).unwrap();

    // THEN: it validates and carries the defaults
    ClaimValidator::default().validate(&claims).unwrap();
    assert_eq!(claims.sub(), Some("alice"));
    assert_eq!(claims.exp().unwrap() - claims.iat().unwrap(), 60);
    assert_eq!(claims.scopes(), vec!["*"]);
}

#[test]
fn test_expired_token_rejected() {
    // GIVEN: a token whose exp is in the past
    let token = expired_token("alice");
    let claims = TokenCodec::new(SECRET).decode(&token).unwrap();

    // WHEN/THEN: the signature is fine but validation fails
    assert_eq!(
        ClaimValidator::default().validate(&claims),
        Err(AuthError::Expired)
    );
}

#[test]
fn test_other_secret_cannot_decode() {
    let token = token_with_scopes("alice", &["read"]);
    assert_eq!(
        TokenCodec::new("another-secret").decode(&token),
        Err(TokenError::Invalid)
    );
}

#[test]
fn test_issuer_round_trip_through_validation() {
    // GIVEN: an issuer configured with iss=evo
    let config = sapi_auth::AuthConfig::builder()
        .secret(SECRET)
        .issuer("evo")
        .build();
    let token = TokenIssuer::new(config.clone())
        .issue("alice", Claims::new(), None)
        .unwrap();

    // WHEN: decoded and validated under the same config
    let claims = config.codec().unwrap().decode(&token).unwrap();
    let validator = ClaimValidator::new(config.validation_policy());

    // THEN: the issuer matches; a token without iss does not
    assert!(validator.validate(&claims).is_ok());
    let bare = TokenIssuer::new(common::config())
        .issue("alice", Claims::new(), None)
        .unwrap();
    let bare = TokenCodec::new(SECRET).decode(&bare).unwrap();
    assert_eq!(validator.validate(&bare), Err(AuthError::IssuerMismatch));
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let protected = || AuthGatewayLayer::new(&config()).require_scope("write").layer(service_fn(echo_identity));

    // GIVEN: a fresh token for alice
    let fresh = token_with_scopes("alice", &["*"]);
    let response = AuthGatewayLayer::new(&config())
        .layer(service_fn(echo_identity))
        .oneshot(
            http::Request::builder()
                .header("authorization", bearer(&fresh))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    // THEN: allowed, and the identity reached the handler
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(&response)["sub"], "alice");

    // WHEN: the token has expired
    let response = protected()
        .oneshot(
            http::Request::builder()
                .header("authorization", bearer(&expired_token("alice")))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    // THEN: 401
    assert_eq!(response.status(), 401);

    // WHEN: scopes are only read on a write route
    let response = protected()
        .oneshot(
            http::Request::builder()
                .header("authorization", bearer(&token_with_scopes("alice", &["read"])))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    // THEN: 403
    assert_eq!(response.status(), 403);
    assert_eq!(body_json(&response)["message"], "Forbidden.");

    // WHEN: the wildcard scope is presented
    let response = protected()
        .oneshot(
            http::Request::builder()
                .header("authorization", bearer(&fresh))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    // THEN: allowed
    assert_eq!(response.status(), 200);
}
