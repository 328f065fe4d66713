//! Gateway configuration
//!
//! [`GatewayConfig`] is read from an optional file (TOML, YAML or JSON by
//! extension) with `SAPI_`-prefixed environment variables layered on top.
//! Nested keys use `__`, so `SAPI_AUTH__SECRET` sets `auth.secret` and
//! `SAPI_LOGGING__ACCESS__MAX_BODY_BYTES` sets `logging.access.max_body_bytes`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use sapi_auth::{AuthConfig, UserConfig};
use sapi_telemetry::LoggingConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::discovery::{self, DiscoveryConfig};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SAPI";

/// Default URL base path
pub const DEFAULT_BASE_PATH: &str = "api";

/// Default global API version
pub const DEFAULT_VERSION: &str = "v1";

/// Complete gateway configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings
    pub server: ServerConfig,
    /// URL layout
    pub api: ApiConfig,
    /// Signing and token defaults
    pub auth: AuthConfig,
    /// Access and audit logging
    pub logging: LoggingConfig,
    /// Route provider discovery
    pub discovery: DiscoveryConfig,
    /// Configured route definitions, listed by `sapi routes`
    pub routes: Value,
    /// Static user table for the token endpoint
    pub users: Vec<UserConfig>,
}

/// Listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind: IpAddr,
    /// Bind port
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// URL layout of the API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Path prefix for every route; may be empty
    pub base_path: String,
    /// Global version segment; may be empty
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl ApiConfig {
    /// Base path without surrounding slashes
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.base_path.trim().trim_matches('/')
    }

    /// Version segment after path-safety normalization
    #[must_use]
    pub fn version(&self) -> String {
        discovery::normalize_version(&self.version)
    }
}

/// Configuration load failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("unsupported configuration file format; use .toml, .yaml, .yml or .json")]
    UnsupportedFormat,

    /// Parsing or type mismatch
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] config::ConfigError),
}

impl GatewayConfig {
    /// Load from `path` (when given) with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, has an unknown extension, or
    /// the merged configuration does not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Load from a file with environment overrides
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::load`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(Some(path.as_ref()))
    }

    /// Load with a custom environment prefix
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::load`].
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            let format = match path.extension().and_then(|s| s.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("yaml" | "yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => return Err(ConfigError::UnsupportedFormat),
            };
            let name = path.to_str().ok_or(ConfigError::UnsupportedFormat)?;
            builder = builder.add_source(File::new(name, format));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
