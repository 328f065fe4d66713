//! HTTP-facing error taxonomy.
//!
//! Every failure that reaches a client is one of these variants. The
//! `Display` text is for logs; clients only ever see [`GatewayError::public_message`],
//! which never carries internal detail.

use http::StatusCode;
use thiserror::Error;

use crate::envelope::ApiResponse;

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error with a fixed status mapping
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Server-side misconfiguration (e.g. no signing secret)
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing, malformed, expired or otherwise invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No matching route or resource
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid request input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Message safe to return to clients
    ///
    /// Validation, not-found and forbidden messages are authored by handlers and
    /// returned as-is. Authentication and server failures use fixed wording so the
    /// response never reveals which check failed.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::Config(_) => "Server misconfigured.",
            Self::Unauthorized(_) => "Unauthorized.",
            Self::Internal(_) => "Internal server error.",
            Self::Forbidden(msg) | Self::NotFound(msg) | Self::Validation(msg) => msg,
        }
    }

    /// Failure envelope for this error
    #[must_use]
    pub fn to_envelope(&self) -> ApiResponse {
        ApiResponse::error(self.public_message(), self.status())
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        self.to_envelope().into_http::<axum::body::Body>()
    }
}
