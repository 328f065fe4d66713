//! Router assembly
//!
//! ```text
//! /{base}/{version}/token            public, token endpoint
//! /{base}/{version}/{endpoint}...    one provider per discovered descriptor,
//!                                    behind the auth gateway
//! anything else                      404 "Not found."
//! ```
//!
//! The access log layer wraps everything, fallback included, so every request
//! gets a fresh [`sapi_core::RequestContext`] and an access record.

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::middleware::map_request;
use axum::routing::post;
use sapi_auth::{AccessPolicy, AuthConfig, AuthGatewayLayer, TokenIssuer, UserProvider};
use sapi_core::RequestContext;
use sapi_telemetry::tower::AccessLogLayer;
use sapi_telemetry::{AccessLogger, AuditLogger};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::discovery::RouteTable;
use crate::handlers::{not_found, token};
use crate::providers::{ProviderRegistry, RouteMount};

/// Shared state of the gateway's own handlers
#[derive(Clone)]
pub struct AppState {
    /// Token signer
    pub issuer: Arc<TokenIssuer>,
    /// Credential lookup
    pub users: Arc<dyn UserProvider>,
    /// Who may obtain tokens
    pub policy: Arc<dyn AccessPolicy>,
    /// Audit records
    pub audit: AuditLogger,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("policy", &self.policy.name())
            .finish_non_exhaustive()
    }
}

/// Everything needed to assemble the router
#[derive(Debug, Clone)]
pub struct RouterParts<'a> {
    /// URL layout
    pub api: &'a ApiConfig,
    /// Signing configuration for the gateway layers
    pub auth: &'a AuthConfig,
    /// Provider classes
    pub registry: &'a ProviderRegistry,
    /// Access records
    pub access: AccessLogger,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

/// `/`-joined path of the non-empty segments
#[must_use]
pub fn join_path(segments: &[&str]) -> String {
    let path: String = segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .flat_map(|s| ["/", s])
        .collect();
    if path.is_empty() { "/".to_string() } else { path }
}

/// Build the complete gateway router
#[must_use]
pub fn build_router(parts: RouterParts<'_>, state: AppState, table: &RouteTable) -> Router {
    let base = parts.api.base_path();
    let version = parts.api.version();
    let token_path = join_path(&[base, &version, "token"]);

    let mut protected = Router::new();
    let mut mounted = 0usize;
    for (key, descriptor) in table {
        let Some(provider) = parts.registry.resolve(&descriptor.class) else {
            warn!(key = %key, class = %descriptor.class, "unknown route provider class, skipping");
            continue;
        };

        let mount = RouteMount::new(
            join_path(&[base, &descriptor.version, &descriptor.endpoint]),
            descriptor.clone(),
        );
        if mount.path() == token_path {
            warn!(key = %key, "route provider collides with the token endpoint, skipping");
            continue;
        }

        // Route name goes on first so denied requests still record it
        let route_name = descriptor.route_name();
        let routes = provider
            .routes(&mount)
            .layer(AuthGatewayLayer::new(parts.auth).require_scopes(provider.required_scopes()))
            .layer(map_request(move |mut req: Request| {
                let route_name = route_name.clone();
                async move {
                    RequestContext::from_extensions_or_insert(req.extensions_mut()).set_route(route_name);
                    req
                }
            }));

        debug!(key = %key, path = %mount.path(), "mounted route provider");
        protected = protected.merge(routes);
        mounted += 1;
    }
    debug!(mounted, "route providers mounted");

    Router::new()
        .route(&token_path, post(token::issue_token))
        .with_state(state)
        .merge(protected)
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(parts.max_body_bytes))
        .layer(AccessLogLayer::new(parts.access).max_request_bytes(parts.max_body_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(&["api", "v1", "token"]), "/api/v1/token");
        assert_eq!(join_path(&["", "v1", "token"]), "/v1/token");
        assert_eq!(join_path(&["/api/", "", "whoami"]), "/api/whoami");
        assert_eq!(join_path(&["", ""]), "/");
    }
}
