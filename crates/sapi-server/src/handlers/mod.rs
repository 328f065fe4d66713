//! HTTP handlers owned by the gateway itself

pub mod token;

use sapi_core::GatewayError;

/// Fallback for unmatched paths and methods
pub async fn not_found() -> GatewayError {
    GatewayError::NotFound("Not found.".to_string())
}
