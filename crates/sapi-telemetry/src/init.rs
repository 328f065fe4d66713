//! Telemetry initialization
//!
//! Provides the [`TelemetryGuard`] for managing the subscriber lifecycle.

use crate::{TelemetryConfig, TelemetryError};
use tracing::info;
use tracing_subscriber::{
    Registry, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Guard that marks telemetry as initialised
///
/// Keep it alive in `main()` for the whole run; dropping it logs shutdown.
///
/// ```rust,ignore
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let _telemetry = TelemetryConfig::default().init()?;
///     run_server().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct TelemetryGuard {
    config: TelemetryConfig,
}

impl TelemetryGuard {
    /// Initialize telemetry with the provided configuration
    ///
    /// `RUST_LOG` takes precedence over the configured level.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfiguration`] for an unparsable level
    /// and [`TelemetryError::TracingError`] when a global subscriber exists.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        init_subscriber(&config)?;

        info!(
            service_name = %config.service_name,
            service_version = %config.service_version,
            json_logs = config.json_logs,
            stderr_output = config.stderr_output,
            "sApi telemetry initialized"
        );

        Ok(Self { config })
    }

    /// Get the service name
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        info!(
            service_name = %self.config.service_name,
            "Shutting down sApi telemetry"
        );
    }
}

/// Parse the level filter, preferring `RUST_LOG`
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidConfiguration`] when neither source parses.
pub fn env_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| TelemetryError::InvalidConfiguration(format!("Invalid log level: {e}")))
}

// Each branch builds its own fmt layer because the layer types differ.
fn init_subscriber(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = env_filter(&config.log_level)?;

    if config.json_logs && config.stderr_output {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .json();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    } else if config.json_logs {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .json();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    } else if config.stderr_output {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .pretty();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    } else {
        let fmt_layer = fmt::layer().with_target(true).pretty();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    }
}
