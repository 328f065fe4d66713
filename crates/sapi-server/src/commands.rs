//! Subcommand implementations of the `sapi` binary

use std::path::Path;

use anyhow::Context;
use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use sapi_auth::{Claims, TokenIssuer};
use serde::Serialize;
use tracing::info;

use crate::SERVICE_NAME;
use crate::cli::{Cli, Command, RoutesArgs, ServeArgs, TokenArgs};
use crate::config::GatewayConfig;
use crate::configured::{ConfiguredRoutes, normalize_routes};
use crate::discovery::{RouteDiscovery, RouteTable};
use crate::router::join_path;
use crate::server::GatewayServer;

/// Run a parsed command line
///
/// # Errors
///
/// Returns configuration, telemetry, bind or signing failures with context.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Routes(args) => routes(&args),
        Command::Token(args) => token(&args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GatewayConfig> {
    GatewayConfig::load(path).with_context(|| match path {
        Some(path) => format!("loading configuration from {}", path.display()),
        None => "loading configuration from the environment".to_string(),
    })
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.config.as_deref())?;
    if let Some(addr) = args.bind {
        config.server.bind = addr.ip();
        config.server.port = addr.port();
    }

    let _guard = config
        .logging
        .telemetry(SERVICE_NAME)
        .init()
        .context("initializing logging")?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting sapi");

    GatewayServer::builder(config)
        .build()
        .context("assembling gateway")?
        .serve()
        .await
        .context("serving gateway")
}

/// Configured and discovered routes, as printed by `sapi routes --json`
#[derive(Debug, Serialize)]
pub struct RoutesReport {
    /// Routes from the `routes` configuration section
    pub configured: ConfiguredRoutes,
    /// Provider descriptors found in the manifests, keyed by `version/endpoint`
    pub discovered: RouteTable,
}

impl RoutesReport {
    /// Build the report for `config`, refreshing the discovery cache if stale
    #[must_use]
    pub fn collect(config: &GatewayConfig) -> Self {
        let discovery = RouteDiscovery::new(config.discovery.clone(), &config.api);
        Self {
            configured: normalize_routes(&config.routes, config.api.base_path()),
            discovered: discovery.load_route_table(),
        }
    }
}

fn routes(args: &RoutesArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.config.as_deref())?;
    let report = RoutesReport::collect(&config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = &report.configured.summary;
    if report.configured.routes.is_empty() {
        println!("No configured routes.");
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Method", "Path", "Handler", "Middleware", "Notes"]);
        for route in &report.configured.routes {
            table.add_row(vec![
                route.method.clone(),
                route.path.clone(),
                route.handler.clone(),
                route.middleware.join(", "),
                route.notes.join("; "),
            ]);
        }
        println!("{table}");
    }
    println!(
        "Configured: {} total, {} protected, {} public",
        summary.total, summary.protected, summary.public
    );

    if report.discovered.is_empty() {
        println!("No route providers discovered.");
        return Ok(());
    }

    let base = config.api.base_path();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Key", "Mount", "Class", "Source"]);
    for (key, descriptor) in &report.discovered {
        table.add_row(vec![
            key.clone(),
            join_path(&[base, &descriptor.version, &descriptor.endpoint]),
            descriptor.class.clone(),
            descriptor.source.as_str().to_string(),
        ]);
    }
    println!("{table}");
    println!("Discovered: {} providers", report.discovered.len());
    Ok(())
}

fn token(args: &TokenArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.config.as_deref())?;
    let issuer = TokenIssuer::new(config.auth);

    let mut claims = Claims::new();
    if !args.scopes.is_empty() {
        claims.insert("scopes", args.scopes.clone());
    }

    let token = issuer
        .issue(&args.sub, claims, args.ttl)
        .context("issuing token")?;
    println!("{token}");
    Ok(())
}
