//! Gateway server
//!
//! [`GatewayServer`] owns the loaded configuration and the collaborators built
//! from it. It can hand out the assembled [`axum::Router`] for embedding or
//! tests, or bind and serve it until Ctrl+C / SIGTERM.

mod builder;
mod shutdown;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sapi_auth::{AccessPolicy, TokenIssuer, UserProvider};
use sapi_telemetry::{AccessLogger, AuditLogger};
use tracing::{info, warn};

pub use builder::GatewayServerBuilder;
pub use shutdown::shutdown_signal;

use crate::config::GatewayConfig;
use crate::discovery::{RouteDiscovery, RouteTable};
use crate::error::{ServerError, ServerResult};
use crate::providers::ProviderRegistry;
use crate::router::{AppState, RouterParts, build_router};

/// An assembled gateway
pub struct GatewayServer {
    config: GatewayConfig,
    registry: ProviderRegistry,
    access: AccessLogger,
    audit: AuditLogger,
    users: Arc<dyn UserProvider>,
    policy: Arc<dyn AccessPolicy>,
    issuer: Arc<TokenIssuer>,
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("addr", &self.config.server.socket_addr())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl GatewayServer {
    /// Start building a server from `config`
    #[must_use]
    pub fn builder(config: GatewayConfig) -> GatewayServerBuilder {
        GatewayServerBuilder::new(config)
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Audit logger shared with handlers
    #[must_use]
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Discovery for the configured manifests
    #[must_use]
    pub fn discovery(&self) -> RouteDiscovery {
        RouteDiscovery::new(self.config.discovery.clone(), &self.config.api)
    }

    /// Router for an already resolved route table
    #[must_use]
    pub fn router(&self, table: &RouteTable) -> Router {
        let parts = RouterParts {
            api: &self.config.api,
            auth: &self.config.auth,
            registry: &self.registry,
            access: self.access.clone(),
            max_body_bytes: self.config.server.max_body_bytes,
        };
        let state = AppState {
            issuer: Arc::clone(&self.issuer),
            users: Arc::clone(&self.users),
            policy: Arc::clone(&self.policy),
            audit: self.audit.clone(),
        };
        build_router(parts, state, table)
    }

    /// Discover routes, bind and serve until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the listener cannot be bound and
    /// [`ServerError::Io`] if serving fails.
    pub async fn serve(self) -> ServerResult<()> {
        if !self.config.auth.has_secret() {
            warn!("no signing secret configured; token and protected routes will answer 500");
        }

        let discovery = self.discovery();
        let table = tokio::task::spawn_blocking(move || discovery.load_route_table())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "route discovery task failed; serving without providers");
                RouteTable::new()
            });

        let app = self.router(&table);
        let addr = self.config.server.socket_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!(
            %addr,
            base_path = %self.config.api.base_path(),
            version = %self.config.api.version(),
            providers = table.len(),
            "sapi gateway listening"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("sapi gateway stopped");
        Ok(())
    }
}
