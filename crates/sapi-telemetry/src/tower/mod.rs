//! Tower middleware that owns the per-request lifecycle
//!
//! [`AccessLogLayer`] is meant to be the outermost layer. For every request it:
//!
//! - creates a fresh [`sapi_core::RequestContext`] and stores it in the request
//!   extensions
//! - resolves the request id (incoming `X-Request-Id` or a new UUIDv4) and
//!   echoes it on the response
//! - records the caller IP
//! - buffers the body when error snapshots are enabled
//! - turns inner errors and panics into a 500 envelope
//! - emits one access record once the response is known
//!
//! # Example
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use sapi_telemetry::{AccessLogger, tower::AccessLogLayer};
//!
//! let service = ServiceBuilder::new()
//!     .layer(AccessLogLayer::new(AccessLogger::tracing()))
//!     .service(router);
//! ```

mod layer;
mod service;

pub use layer::AccessLogLayer;
pub use service::{AccessLogFuture, AccessLogService};

use http::HeaderMap;

/// Longest incoming request id accepted
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Incoming request id if usable, otherwise a new UUIDv4
#[must_use]
pub fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(sapi_core::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.chars().count() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string)
}

/// Caller address from proxy headers, then the connection
#[must_use]
pub fn client_ip<B>(req: &http::Request<B>) -> Option<String> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(ip) = header("x-forwarded-for").or_else(|| header("x-real-ip")) {
        return Some(ip);
    }

    #[cfg(feature = "axum")]
    if let Some(axum::extract::ConnectInfo(addr)) = req
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
    {
        return Some(addr.ip().to_string());
    }

    None
}
