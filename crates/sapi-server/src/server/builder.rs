//! Builder for [`GatewayServer`]

use std::sync::Arc;

use sapi_auth::{AccessPolicy, StaticUserProvider, TokenIssuer, UserProvider};
use sapi_telemetry::{AccessLogger, AuditLogger, RecordSink, TracingSink};

use super::GatewayServer;
use crate::config::GatewayConfig;
use crate::error::ServerResult;
use crate::providers::ProviderRegistry;

/// Builder for constructing a gateway with custom collaborators
pub struct GatewayServerBuilder {
    config: GatewayConfig,
    registry: Option<ProviderRegistry>,
    sink: Option<Arc<dyn RecordSink>>,
    users: Option<Arc<dyn UserProvider>>,
    policy: Option<Arc<dyn AccessPolicy>>,
}

impl std::fmt::Debug for GatewayServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServerBuilder")
            .field("registry", &self.registry)
            .field("custom_users", &self.users.is_some())
            .finish_non_exhaustive()
    }
}

impl GatewayServerBuilder {
    /// Start from `config`
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            registry: None,
            sink: None,
            users: None,
            policy: None,
        }
    }

    /// Provider classes (default: the built-in providers)
    #[must_use]
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Destination for access and audit records (default: tracing)
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Credential lookup (default: the configured user table)
    #[must_use]
    pub fn user_provider(mut self, users: Arc<dyn UserProvider>) -> Self {
        self.users = Some(users);
        self
    }

    /// Token endpoint policy (default: `auth.token_policy`)
    #[must_use]
    pub fn access_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Build the server
    ///
    /// # Errors
    ///
    /// Returns [`crate::ServerError::Telemetry`] if an audit exclusion pattern
    /// does not compile.
    pub fn build(self) -> ServerResult<GatewayServer> {
        let config = self.config;
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink) as Arc<dyn RecordSink>);

        let access = AccessLogger::new(&config.logging, Arc::clone(&sink));
        let audit = AuditLogger::new(&config.logging, sink)?;
        let users = self
            .users
            .unwrap_or_else(|| {
                Arc::new(StaticUserProvider::new(config.users.clone())) as Arc<dyn UserProvider>
            });
        let policy = self
            .policy
            .unwrap_or_else(|| config.auth.token_policy.build());
        let issuer = Arc::new(TokenIssuer::new(config.auth.clone()));

        Ok(GatewayServer {
            registry: self.registry.unwrap_or_else(ProviderRegistry::with_builtin),
            config,
            access,
            audit,
            users,
            policy,
            issuer,
        })
    }
}
