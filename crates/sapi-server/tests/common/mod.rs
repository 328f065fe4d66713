//! Common test utilities for integration tests
//!
//! A gateway with two configured users, an in-memory record sink and a route
//! table built by hand, plus helpers to drive the assembled router.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::routing::get;
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use sapi_auth::users::sha256_hex;
use sapi_auth::{AuthConfig, Claims, TokenIssuer, UserConfig};
use sapi_core::ApiResponse;
use sapi_server::discovery::{DescriptorSource, DiscoveryConfig};
use sapi_server::providers::WHOAMI_CLASS;
use sapi_server::{
    GatewayConfig, GatewayServer, ProviderRegistry, RouteDescriptor, RouteMount, RouteProvider,
    RouteTable,
};
use sapi_telemetry::{MemorySink, RecordKind, RecordSink};
use serde_json::{Map, Value, json};
use tower::ServiceExt;

/// Secret shared by every suite
pub const SECRET: &str = "server-integration-secret";

/// Class id of the scoped test provider
pub const ORDERS_CLASS: &str = "shop.orders";

/// Provider whose routes require the `write` scope
#[derive(Debug, Default)]
pub struct OrdersProvider;

impl RouteProvider for OrdersProvider {
    fn routes(&self, mount: &RouteMount) -> Router {
        Router::new().route(
            mount.path(),
            get(|| async { ApiResponse::success(json!({ "orders": [] })) }),
        )
    }

    fn required_scopes(&self) -> Vec<String> {
        vec!["write".to_string()]
    }
}

/// `alice` (role 1) and `bob` (role 2)
pub fn users() -> Vec<UserConfig> {
    vec![
        UserConfig {
            username: "alice".into(),
            id: Some("42".into()),
            role: Some(1),
            password_sha256: sha256_hex("wonderland"),
        },
        UserConfig {
            username: "bob".into(),
            id: None,
            role: Some(2),
            password_sha256: sha256_hex("builder"),
        },
    ]
}

/// Gateway config with the shared secret and test users
pub fn config() -> GatewayConfig {
    GatewayConfig {
        auth: AuthConfig::builder().secret(SECRET).ttl_seconds(60).build(),
        users: users(),
        ..GatewayConfig::default()
    }
}

/// Discovery config pointing into `dir`
pub fn discovery_config(dir: &Path) -> DiscoveryConfig {
    DiscoveryConfig {
        base_manifest: dir.join("composer.lock"),
        override_manifest: dir.join("custom").join("composer.json"),
        cache_path: dir.join("cache").join("routes.json"),
    }
}

/// Registry with the built-in providers and [`OrdersProvider`]
pub fn registry() -> ProviderRegistry {
    ProviderRegistry::with_builtin().with(ORDERS_CLASS, || {
        Arc::new(OrdersProvider) as Arc<dyn RouteProvider>
    })
}

/// A descriptor as discovery would produce it
pub fn descriptor(class: &str, endpoint: &str, version: &str) -> RouteDescriptor {
    RouteDescriptor {
        class: class.into(),
        endpoint: endpoint.into(),
        version: version.into(),
        source: DescriptorSource::Vendor,
    }
}

/// `whoami` and `orders` under `v1`
pub fn table() -> RouteTable {
    [
        descriptor(WHOAMI_CLASS, "whoami", "v1"),
        descriptor(ORDERS_CLASS, "orders", "v1"),
    ]
    .into_iter()
    .map(|d| (d.key(), d))
    .collect()
}

/// Assembled router plus the sink receiving its records
pub struct Gateway {
    pub app: Router,
    pub sink: MemorySink,
}

impl Gateway {
    /// Gateway for `config` over [`table`]
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_table(config, &table())
    }

    /// Gateway for `config` over an explicit table
    pub fn with_table(config: GatewayConfig, table: &RouteTable) -> Self {
        let sink = MemorySink::new();
        let app = router(config, table, Arc::new(sink.clone()));
        Self { app, sink }
    }

    /// Gateway whose records go to `sink`; [`Gateway::access`] and
    /// [`Gateway::audit`] stay empty
    pub fn with_sink(config: GatewayConfig, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            app: router(config, &table(), sink),
            sink: MemorySink::new(),
        }
    }

    /// Send a request and return status plus JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.call(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Send a request and return the raw response
    pub async fn call(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("router is infallible")
    }

    /// Access records emitted so far
    pub fn access(&self) -> Vec<Map<String, Value>> {
        self.sink.of_kind(RecordKind::Access)
    }

    /// Audit records emitted so far
    pub fn audit(&self) -> Vec<Map<String, Value>> {
        self.sink.of_kind(RecordKind::Audit)
    }
}

fn router(config: GatewayConfig, table: &RouteTable, sink: Arc<dyn RecordSink>) -> Router {
    GatewayServer::builder(config)
        .registry(registry())
        .sink(sink)
        .build()
        .expect("build gateway")
        .router(table)
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

/// `POST` a JSON body
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `GET` with an optional bearer token
pub fn get_with(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Issue a token for `sub` carrying `scopes`
pub fn token_with_scopes(sub: &str, scopes: &[&str]) -> String {
    TokenIssuer::new(config().auth)
        .issue(sub, Claims::new().with("scopes", json!(scopes)), None)
        .expect("issue token")
}
