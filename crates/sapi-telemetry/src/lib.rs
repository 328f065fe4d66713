//! Structured logging and request records for the sApi gateway
//!
//! This crate provides the observability side of the gateway:
//!
//! - **Subscriber Setup**: `tracing-subscriber` initialisation with JSON or pretty output
//! - **Access Records**: one structured record per completed request
//! - **Audit Records**: one structured record per domain event
//! - **Redaction and Bounding**: sensitive keys masked, payloads capped in size
//! - **Tower Middleware**: request id, context creation and access logging
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sapi_telemetry::TelemetryConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let _guard = TelemetryConfig::builder()
//!         .service_name("sapi")
//!         .log_level("info")
//!         .build()
//!         .init()?;
//!
//!     // Your server code here...
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `tower` (default) - [`tower::AccessLogLayer`] middleware
//! - `axum` - read the caller address from axum's `ConnectInfo`
//!
//! # Record Flow
//!
//! ```text
//! request ─► AccessLogLayer ─► ... handlers ... ─► response
//!               │ creates RequestContext            │
//!               │                AuditLogger::log ──┼─► RecordSink
//!               └───────── AccessLogger::log ───────┴─► RecordSink
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
mod init;

pub mod access;
pub mod audit;
pub mod redact;
pub mod sink;
pub mod truncate;

#[cfg(feature = "tower")]
#[cfg_attr(docsrs, doc(cfg(feature = "tower")))]
pub mod tower;

// Re-exports
pub use access::{AccessEntry, AccessLogger};
pub use audit::AuditLogger;
pub use config::{
    AccessLogConfig, AuditLogConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_CONTEXT_BYTES,
    LoggingConfig, RedactConfig, TelemetryConfig, TelemetryConfigBuilder,
};
pub use error::{TelemetryError, TelemetryResult};
pub use init::{TelemetryGuard, env_filter};
pub use redact::{MASK, Redactor};
pub use sink::{MemorySink, RecordKind, RecordSink, TracingSink};

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::access::AccessLogger;
    pub use super::audit::AuditLogger;
    pub use super::config::{LoggingConfig, TelemetryConfig};
    pub use super::error::{TelemetryError, TelemetryResult};
    pub use super::init::TelemetryGuard;
    pub use super::sink::{MemorySink, RecordSink, TracingSink};

    #[cfg(feature = "tower")]
    pub use super::tower::AccessLogLayer;
}
