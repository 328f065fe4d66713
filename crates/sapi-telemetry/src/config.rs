//! Telemetry configuration
//!
//! Two layers of configuration live here:
//!
//! - [`TelemetryConfig`] controls the tracing subscriber (level, format, writer)
//! - [`LoggingConfig`] controls access and audit records (switches, exclusions,
//!   redaction keys and size caps) and is deserialized from the gateway config

use serde::Deserialize;

/// Byte cap for request body snapshots when none (or zero) is configured
pub const DEFAULT_MAX_BODY_BYTES: usize = 4096;
/// Byte cap for audit context payloads when none (or zero) is configured
pub const DEFAULT_MAX_CONTEXT_BYTES: usize = 8192;

/// Telemetry configuration
///
/// Use [`TelemetryConfigBuilder`] for ergonomic configuration construction.
///
/// # Example
///
/// ```rust
/// use sapi_telemetry::TelemetryConfig;
///
/// let config = TelemetryConfig::builder()
///     .service_name("sapi")
///     .service_version("1.0.0")
///     .log_level("info,sapi=debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for telemetry identification
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "debug", "info,sapi=debug")
    pub log_level: String,
    /// Enable JSON-formatted log output
    pub json_logs: bool,
    /// Output logs to stderr instead of stdout
    pub stderr_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "sapi".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            json_logs: true,
            stderr_output: false,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    /// Initialize telemetry with this configuration
    ///
    /// Returns a guard that must be kept alive for the life of the process.
    ///
    /// # Errors
    ///
    /// Fails if the level filter is invalid or a global subscriber is already
    /// installed.
    pub fn init(self) -> Result<crate::TelemetryGuard, crate::TelemetryError> {
        crate::TelemetryGuard::init(self)
    }
}

/// Builder for [`TelemetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
    stderr_output: Option<bool>,
}

impl TelemetryConfigBuilder {
    /// Set the service name
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the service version
    #[must_use]
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Set the log level filter
    ///
    /// Examples: "info", "debug", "warn,sapi=debug,tower_http=info"
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Enable or disable JSON log output
    #[must_use]
    pub fn json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = Some(enabled);
        self
    }

    /// Enable or disable stderr output
    #[must_use]
    pub fn stderr_output(mut self, enabled: bool) -> Self {
        self.stderr_output = Some(enabled);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();

        TelemetryConfig {
            service_name: self.service_name.unwrap_or(defaults.service_name),
            service_version: self.service_version.unwrap_or(defaults.service_version),
            log_level: self.log_level.unwrap_or(defaults.log_level),
            json_logs: self.json_logs.unwrap_or(defaults.json_logs),
            stderr_output: self.stderr_output.unwrap_or(defaults.stderr_output),
        }
    }
}

/// Access and audit record settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global switch for access and audit records
    pub enabled: bool,
    /// Subscriber level filter
    pub level: String,
    /// JSON subscriber output
    pub json: bool,
    /// Access record settings
    pub access: AccessLogConfig,
    /// Audit record settings
    pub audit: AuditLogConfig,
    /// Redaction settings
    pub redact: RedactConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json: true,
            access: AccessLogConfig::default(),
            audit: AuditLogConfig::default(),
            redact: RedactConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Subscriber configuration derived from these settings
    #[must_use]
    pub fn telemetry(&self, service_name: impl Into<String>) -> TelemetryConfig {
        TelemetryConfig::builder()
            .service_name(service_name)
            .log_level(self.level.clone())
            .json_logs(self.json)
            .build()
    }
}

/// Access record settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Emit access records
    pub enabled: bool,
    /// Request paths never logged (exact match)
    pub exclude_paths: Vec<String>,
    /// Attach a request body snapshot to error responses
    pub log_body_on_error: bool,
    /// Byte cap for the body snapshot
    pub max_body_bytes: usize,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_paths: Vec::new(),
            log_body_on_error: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl AccessLogConfig {
    /// Body cap with zero coerced to the default
    #[must_use]
    pub fn body_cap(&self) -> usize {
        if self.max_body_bytes == 0 {
            DEFAULT_MAX_BODY_BYTES
        } else {
            self.max_body_bytes
        }
    }
}

/// Audit record settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditLogConfig {
    /// Emit audit records
    pub enabled: bool,
    /// Event name globs that are suppressed (`*`, `?`, `[...]`)
    pub exclude_events: Vec<String>,
    /// Byte cap for the context payload
    pub max_context_bytes: usize,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_events: Vec::new(),
            max_context_bytes: DEFAULT_MAX_CONTEXT_BYTES,
        }
    }
}

impl AuditLogConfig {
    /// Context cap with zero coerced to the default
    #[must_use]
    pub fn context_cap(&self) -> usize {
        if self.max_context_bytes == 0 {
            DEFAULT_MAX_CONTEXT_BYTES
        } else {
            self.max_context_bytes
        }
    }
}

/// Redaction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedactConfig {
    /// Keys whose values are masked (case-insensitive)
    pub body_keys: Vec<String>,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self {
            body_keys: ["password", "token", "refresh_token", "jwt", "secret"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
