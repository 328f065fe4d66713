//! The response envelope returned by every gateway endpoint.

use http::{HeaderValue, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{success, message, object, code}` envelope
///
/// The HTTP status of the response always equals `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Short human-readable message; empty on most successes
    pub message: String,
    /// Payload; `{}` when there is nothing to return
    pub object: Value,
    /// HTTP status code
    pub code: u16,
}

impl ApiResponse {
    /// Successful envelope with status 200
    pub fn success(object: impl Into<Value>) -> Self {
        Self::success_with(object, "", StatusCode::OK)
    }

    /// Successful envelope with an explicit message and status
    pub fn success_with(object: impl Into<Value>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            success: true,
            message: message.into(),
            object: object_or_empty(object.into()),
            code: status.as_u16(),
        }
    }

    /// Failure envelope with an empty object
    pub fn error(message: impl Into<String>, status: StatusCode) -> Self {
        Self::error_with(message, status, Value::Object(serde_json::Map::new()))
    }

    /// Failure envelope carrying an object payload
    pub fn error_with(message: impl Into<String>, status: StatusCode, object: impl Into<Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            object: object_or_empty(object.into()),
            code: status.as_u16(),
        }
    }

    /// HTTP status matching `code`, falling back to 500 for out-of-range values
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Serialized JSON body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"success":{},"message":"","object":{{}},"code":{}}}"#,
                self.success, self.code
            )
        })
    }

    /// Build an HTTP response for any body type constructible from a `String`
    pub fn into_http<B: From<String>>(self) -> http::Response<B> {
        let mut response = http::Response::new(B::from(self.to_json()));
        *response.status_mut() = self.status();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

fn object_or_empty(value: Value) -> Value {
    match value {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiResponse {
    fn into_response(self) -> axum::response::Response {
        self.into_http::<axum::body::Body>()
    }
}
