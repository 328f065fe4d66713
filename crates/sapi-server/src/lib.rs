//! # sApi Server
//!
//! The HTTP side of the sApi gateway:
//!
//! - **Configuration** - [`GatewayConfig`] from a file plus `SAPI_*` environment variables
//! - **Discovery** - provider declarations in manifest files become a cached
//!   [`discovery::RouteTable`]
//! - **Providers** - a [`ProviderRegistry`] maps declared classes to route factories
//! - **Token endpoint** - username/password exchange for a signed bearer token
//! - **Router** - token route, gateway-protected provider routes, 404 fallback,
//!   all wrapped in access logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sapi_server::{GatewayConfig, GatewayServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::load(None)?;
//!     GatewayServer::builder(config).build()?.serve().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Embedding the Router
//!
//! ```rust,ignore
//! let server = GatewayServer::builder(config)
//!     .registry(ProviderRegistry::with_builtin().with("shop.orders", || Arc::new(Orders)))
//!     .build()?;
//! let table = server.discovery().load_route_table();
//! let app: axum::Router = server.router(&table);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod commands;
pub mod config;
pub mod configured;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod providers;
pub mod router;
pub mod server;

pub use config::{ApiConfig, ConfigError, GatewayConfig, ServerConfig};
pub use configured::{ConfiguredRoute, ConfiguredRoutes, RouteSummary, normalize_routes};
pub use discovery::{DiscoveryConfig, RouteDescriptor, RouteDiscovery, RouteTable};
pub use error::{ServerError, ServerResult};
pub use providers::{ProviderRegistry, RouteMount, RouteProvider};
pub use server::{GatewayServer, GatewayServerBuilder};

/// Service name used for logging
pub const SERVICE_NAME: &str = "sapi";
