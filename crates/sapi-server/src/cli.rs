//! Command line interface of the `sapi` binary

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Longest lifetime `sapi token --ttl` accepts, ten years
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// sApi gateway
#[derive(Parser, Debug)]
#[command(
    name = "sapi",
    version,
    about = "JWT auth gateway with discovered route providers",
    long_about = "Issues and verifies HS256 bearer tokens, mounts route providers declared in \
                  package manifests, and writes redacted access and audit records.\n\n\
                  Configuration is read from --config (toml, yaml or json) and SAPI_* \
                  environment variables, e.g. SAPI_AUTH__SECRET."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the gateway
    Serve(ServeArgs),

    /// Print configured and discovered routes
    Routes(RoutesArgs),

    /// Issue a token without running the server
    Token(TokenArgs),
}

/// Configuration file option shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file
    #[arg(long, short = 'c', env = "SAPI_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// `sapi serve`
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Listen address, overriding `server.bind` and `server.port`
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

/// `sapi routes`
#[derive(Args, Debug)]
pub struct RoutesArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// `sapi token`
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Subject of the token
    pub sub: String,

    /// Comma-separated scopes (default: `auth.scopes`)
    #[arg(long, value_delimiter = ',')]
    pub scopes: Vec<String>,

    /// Lifetime in seconds (default: `auth.ttl_seconds`)
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_TTL_SECONDS))]
    pub ttl: Option<i64>,

    #[command(flatten)]
    pub config: ConfigArgs,
}
