//! Tower Service implementation for the auth gateway
//!
//! Per request:
//!
//! 1. Claims already verified earlier in the same request are reused; only the
//!    scope check runs again
//! 2. Otherwise the bearer token is read from the configured header
//!    (case-insensitive `Bearer` scheme); a missing or blank token is 401
//! 3. No signing secret configured is 500
//! 4. Decode or claim validation failure is 401, whatever the cause
//! 5. `sub` and `scopes` are written to the [`RequestContext`]
//! 6. Required scopes not covered is 403
//! 7. Otherwise the request is forwarded

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::HeaderMap;
use sapi_core::{GatewayError, RequestContext};
use tower_service::Service;
use tracing::{debug, warn};

use crate::error::{AuthError, TokenError};
use crate::jwt::{Claims, TokenCodec};
use crate::validation::ClaimValidator;

use super::AuthGatewayConfig;

/// Tower Service that verifies bearer tokens before forwarding
#[derive(Debug, Clone)]
pub struct AuthGatewayService<S> {
    inner: S,
    codec: Option<TokenCodec>,
    validator: Arc<ClaimValidator>,
    config: AuthGatewayConfig,
}

impl<S> AuthGatewayService<S> {
    /// Create a new gateway service
    pub fn new(
        inner: S,
        codec: Option<TokenCodec>,
        validator: Arc<ClaimValidator>,
        config: AuthGatewayConfig,
    ) -> Self {
        Self {
            inner,
            codec,
            validator,
            config,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Run the gateway checks, leaving claims and identity on the request
    fn authenticate<B>(&self, req: &mut http::Request<B>) -> Result<(), AuthError> {
        let ctx = RequestContext::from_extensions_or_insert(req.extensions_mut());

        let claims = match req.extensions().get::<Claims>() {
            Some(claims) => claims.clone(),
            None => {
                let token = extract_bearer(req.headers(), &self.config.header)
                    .ok_or(AuthError::Token(TokenError::Invalid))?;
                let codec = self.codec.as_ref().ok_or(AuthError::MissingSecret)?;
                let claims = codec.decode(&token)?;
                self.validator.validate(&claims)?;
                req.extensions_mut().insert(claims.clone());
                claims
            }
        };

        if let Some(sub) = claims.sub() {
            ctx.set_sub(sub);
        }
        ctx.set_scopes(claims.scopes());

        self.validator
            .authorize(&claims, &self.config.required_scopes)
    }
}

/// Read a bearer token from `header`
///
/// The scheme is matched case-insensitively and the token is trimmed; an empty
/// token yields `None`.
pub fn extract_bearer(headers: &HeaderMap, header: &str) -> Option<String> {
    let value = headers.get(header)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Future type for gateway responses
pub type AuthGatewayFuture<T, E> = BoxFuture<'static, Result<T, E>>;

impl<S, B, ResBody> Service<http::Request<B>> for AuthGatewayService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = AuthGatewayFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        match self.authenticate(&mut req) {
            Ok(()) => {
                let inner = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, inner);
                Box::pin(async move { inner.call(req).await })
            }
            Err(err) => {
                if err.is_config() {
                    warn!(path = %req.uri().path(), "rejecting request: {err}");
                } else {
                    debug!(path = %req.uri().path(), reason = %err, "request denied");
                }
                let response = GatewayError::from(err).to_envelope().into_http();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
