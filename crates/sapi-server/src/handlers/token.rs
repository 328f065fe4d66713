//! Token endpoint
//!
//! `POST /{base}/{version}/token` exchanges a username and password for a
//! signed token. The body may be JSON or form encoded. Checks run in order and
//! the first failure decides the response:
//!
//! | Failure                      | Status | Message                 |
//! |------------------------------|--------|-------------------------|
//! | body over the size limit     | 413    | Payload too large.      |
//! | body could not be read       | 400    | Invalid request body.   |
//! | blank username               | 422    | Username is required.   |
//! | blank password               | 422    | Password is required.   |
//! | unknown user                 | 404    | User not found.         |
//! | wrong password               | 401    | Invalid credentials.    |
//! | access policy refuses user   | 403    | Access denied.          |
//! | no signing secret            | 500    | Server misconfigured.   |
//! | any other signing failure    | 500    | Failed to issue token.  |

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use http::{StatusCode, header};
use http_body_util::LengthLimitError;
use sapi_auth::{AuthError, Claims, UserRecord};
use sapi_core::{ApiResponse, RequestContext};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::router::AppState;

/// Route name recorded for the token endpoint
pub const TOKEN_ROUTE: &str = "sapi.token";

/// Audit event emitted on success
pub const TOKEN_ISSUED_EVENT: &str = "token.issued";

/// Reasons a token request is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRequestError {
    /// Body exceeded the configured size limit
    #[error("Payload too large.")]
    PayloadTooLarge,
    /// Body stream failed before it was fully read
    #[error("Invalid request body.")]
    UnreadableBody,
    /// Username missing or blank
    #[error("Username is required.")]
    MissingUsername,
    /// Password missing or blank
    #[error("Password is required.")]
    MissingPassword,
    /// No such user
    #[error("User not found.")]
    UnknownUser,
    /// Password did not verify
    #[error("Invalid credentials.")]
    InvalidCredentials,
    /// The access policy refused the user
    #[error("Access denied.")]
    AccessDenied,
    /// No signing secret configured
    #[error("Server misconfigured.")]
    Misconfigured,
    /// Signing failed for another reason
    #[error("Failed to issue token.")]
    IssueFailed,
}

impl TokenRequestError {
    /// HTTP status for this refusal
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnreadableBody => StatusCode::BAD_REQUEST,
            Self::MissingUsername | Self::MissingPassword => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownUser => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::Misconfigured | Self::IssueFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for TokenRequestError {
    fn from(err: AuthError) -> Self {
        if err.is_config() {
            Self::Misconfigured
        } else {
            Self::IssueFailed
        }
    }
}

impl From<axum::Error> for TokenRequestError {
    fn from(err: axum::Error) -> Self {
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(e) = source {
            if e.is::<LengthLimitError>() {
                return Self::PayloadTooLarge;
            }
            source = e.source();
        }
        Self::UnreadableBody
    }
}

impl IntoResponse for TokenRequestError {
    fn into_response(self) -> Response {
        ApiResponse::error(self.to_string(), self.status()).into_response()
    }
}

/// Submitted credentials
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Trimmed username
    pub username: String,
    /// Trimmed password
    pub password: String,
}

impl Credentials {
    /// Read credentials from a JSON object or a form-encoded body
    #[must_use]
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Self {
        let is_form = content_type
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let fields = if is_form {
            None
        } else {
            serde_json::from_slice::<Value>(body)
                .ok()
                .and_then(|value| match value {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
        };
        let fields = fields.unwrap_or_else(|| form_fields(body));

        Self {
            username: field(&fields, "username"),
            password: field(&fields, "password"),
        }
    }
}

fn form_fields(body: &[u8]) -> Map<String, Value> {
    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}

fn field(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Issue a token for valid credentials
pub async fn issue_token(
    State(state): State<AppState>,
    mut request: Request,
) -> Result<ApiResponse, TokenRequestError> {
    let ctx = RequestContext::from_extensions_or_insert(request.extensions_mut());
    ctx.set_route(TOKEN_ROUTE);

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase);
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|err| {
            debug!(error = %err, "token request body unreadable");
            TokenRequestError::from(err)
        })?;

    let credentials = Credentials::parse(content_type.as_deref(), &body);
    let (token, user) = authorize(&state, &credentials).await?;

    ctx.set_user_id(user.id);
    ctx.set_sub(credentials.username.clone());
    state.audit.log(
        &ctx,
        TOKEN_ISSUED_EVENT,
        json!({ "username": credentials.username }),
    );
    info!(username = %credentials.username, "token issued");

    Ok(ApiResponse::success(json!({ "token": token })))
}

async fn authorize(
    state: &AppState,
    credentials: &Credentials,
) -> Result<(String, UserRecord), TokenRequestError> {
    if credentials.username.is_empty() {
        return Err(TokenRequestError::MissingUsername);
    }
    if credentials.password.is_empty() {
        return Err(TokenRequestError::MissingPassword);
    }

    let user = state
        .users
        .find(&credentials.username)
        .await
        .ok_or(TokenRequestError::UnknownUser)?;

    if !state
        .users
        .verify(&credentials.username, &credentials.password)
        .await
    {
        debug!(username = %credentials.username, "credential check failed");
        return Err(TokenRequestError::InvalidCredentials);
    }

    if !state.policy.permits(&user) {
        debug!(username = %credentials.username, policy = state.policy.name(), "token refused by access policy");
        return Err(TokenRequestError::AccessDenied);
    }

    let token = state
        .issuer
        .issue(&credentials.username, Claims::new(), None)
        .map_err(|err| {
            warn!(error = %err, "token issuing failed");
            TokenRequestError::from(err)
        })?;
    Ok((token, user))
}
