//! Error types for token handling.

use sapi_core::GatewayError;
use thiserror::Error;

/// Token decode failure
///
/// Malformed segments, bad base64, non-object payloads, algorithm mismatches and
/// signature mismatches all collapse into one variant so callers cannot tell
/// them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token could not be decoded or its signature did not verify
    #[error("invalid token")]
    Invalid,
}

/// Authentication and authorization failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No signing secret is configured
    #[error("signing secret is not configured")]
    MissingSecret,

    /// No principal was supplied for issuance
    #[error("token subject is required")]
    MissingSubject,

    /// The claims could not be serialized or signed
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// `iat + ttl` does not fit in a timestamp
    #[error("token expiry out of range")]
    ExpiryOutOfRange,

    /// Decode failure
    #[error(transparent)]
    Token(#[from] TokenError),

    /// `nbf` is in the future
    #[error("token not yet valid")]
    NotYetValid,

    /// `exp` is in the past
    #[error("token expired")]
    Expired,

    /// `iss` is absent or does not match the configured issuer
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// Valid token without the required scopes
    #[error("insufficient scope")]
    InsufficientScope,
}

impl AuthError {
    /// Whether this failure is a server-side configuration problem
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingSecret)
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingSecret => GatewayError::Config(err.to_string()),
            AuthError::Signing(_) | AuthError::MissingSubject | AuthError::ExpiryOutOfRange => {
                GatewayError::Internal(err.to_string())
            }
            AuthError::InsufficientScope => GatewayError::Forbidden("Forbidden.".to_string()),
            AuthError::Token(_)
            | AuthError::NotYetValid
            | AuthError::Expired
            | AuthError::IssuerMismatch => GatewayError::Unauthorized(err.to_string()),
        }
    }
}
