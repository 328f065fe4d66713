//! # Tower Middleware for Bearer-Token Authentication
//!
//! [`AuthGatewayLayer`] wraps an HTTP service with token verification and scope
//! enforcement. Denied requests never reach the inner service; they receive
//! the standard JSON envelope with status 401, 403 or 500.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use sapi_auth::{AuthConfig, AuthGatewayLayer};
//!
//! let layer = AuthGatewayLayer::new(&config).require_scope("write");
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(my_inner_service);
//! ```
//!
//! ## Request Extensions
//!
//! On success the verified [`crate::Claims`] are inserted into the request
//! extensions and `sub`/`scopes` are written to the request's
//! [`sapi_core::RequestContext`]. A later gateway in the same request reuses
//! those claims instead of decoding the token again.

mod layer;
mod service;

pub use layer::AuthGatewayLayer;
pub use service::{AuthGatewayFuture, AuthGatewayService, extract_bearer};

/// Default header carrying the bearer token
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Configuration for the gateway layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGatewayConfig {
    /// Scopes every request must carry (empty means any valid token)
    pub required_scopes: Vec<String>,
    /// Header to read the token from (default: `Authorization`)
    pub header: String,
}

impl Default for AuthGatewayConfig {
    fn default() -> Self {
        Self {
            required_scopes: Vec::new(),
            header: AUTHORIZATION_HEADER.to_string(),
        }
    }
}

impl AuthGatewayConfig {
    /// Config requiring the given scopes
    #[must_use]
    pub fn with_required_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().require_scopes(scopes)
    }

    /// Add one required scope
    #[must_use]
    pub fn require_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        let scope = scope.trim();
        if !scope.is_empty() && !self.required_scopes.iter().any(|s| s == scope) {
            self.required_scopes.push(scope.to_string());
        }
        self
    }

    /// Add several required scopes
    #[must_use]
    pub fn require_scopes<I, S>(self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        scopes
            .into_iter()
            .fold(self, |config, scope| config.require_scope(scope))
    }

    /// Set the token header name
    #[must_use]
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }
}
