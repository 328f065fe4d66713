//! Tower Layer implementation for the auth gateway

use std::sync::Arc;
use tower::Layer;

use crate::config::AuthConfig;
use crate::jwt::TokenCodec;
use crate::validation::ClaimValidator;

use super::AuthGatewayConfig;
use super::service::AuthGatewayService;

/// Tower Layer that puts bearer-token verification in front of a service
///
/// A configuration without a secret still builds a layer; every request through
/// it is then denied with 500 rather than 401.
///
/// # Example
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use sapi_auth::AuthGatewayLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(AuthGatewayLayer::new(&config).require_scope("write"))
///     .service(my_inner_service);
/// ```
#[derive(Debug, Clone)]
pub struct AuthGatewayLayer {
    codec: Option<TokenCodec>,
    validator: Arc<ClaimValidator>,
    config: AuthGatewayConfig,
}

impl AuthGatewayLayer {
    /// Create a layer with default configuration
    pub fn new(auth: &AuthConfig) -> Self {
        Self::with_config(auth, AuthGatewayConfig::default())
    }

    /// Create a layer with custom configuration
    pub fn with_config(auth: &AuthConfig, config: AuthGatewayConfig) -> Self {
        Self {
            codec: auth.codec().ok(),
            validator: Arc::new(ClaimValidator::new(auth.validation_policy())),
            config,
        }
    }

    /// Require a scope on every request
    #[must_use]
    pub fn require_scope(mut self, scope: impl Into<String>) -> Self {
        self.config = self.config.require_scope(scope);
        self
    }

    /// Require several scopes on every request
    #[must_use]
    pub fn require_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.require_scopes(scopes);
        self
    }

    /// The active configuration
    pub fn config(&self) -> &AuthGatewayConfig {
        &self.config
    }

    /// Whether a signing secret was available
    pub fn is_configured(&self) -> bool {
        self.codec.is_some()
    }
}

impl<S> Layer<S> for AuthGatewayLayer {
    type Service = AuthGatewayService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGatewayService::new(
            inner,
            self.codec.clone(),
            Arc::clone(&self.validator),
            self.config.clone(),
        )
    }
}
