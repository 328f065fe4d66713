//! Tower Service implementation for access logging

use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http::HeaderValue;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use sapi_core::{ApiResponse, GatewayError, REQUEST_ID_HEADER, RequestContext};
use tower_service::Service;
use tracing::{error, warn};

use super::{client_ip, resolve_request_id};
use crate::access::{AccessEntry, AccessLogger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Tower Service that records one access entry per request
#[derive(Debug, Clone)]
pub struct AccessLogService<S> {
    inner: S,
    logger: AccessLogger,
    max_request_bytes: Option<usize>,
}

impl<S> AccessLogService<S> {
    /// Create a new access log service wrapping the inner service
    pub fn new(inner: S, logger: AccessLogger) -> Self {
        Self {
            inner,
            logger,
            max_request_bytes: None,
        }
    }

    /// Cap on buffered request bodies
    #[must_use]
    pub fn with_max_request_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_request_bytes = limit;
        self
    }

    /// Get a reference to the inner service
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Future type for access log service responses
pub type AccessLogFuture<T, E> = BoxFuture<'static, Result<T, E>>;

struct RequestMeta {
    method: String,
    path: String,
    query: Option<String>,
    user_agent: Option<String>,
    content_type: Option<String>,
}

impl RequestMeta {
    fn from_request<B>(req: &http::Request<B>) -> Self {
        let header = |name: http::header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(str::to_string),
            user_agent: header(http::header::USER_AGENT),
            content_type: header(http::header::CONTENT_TYPE),
        }
    }
}

impl<S, B, ResBody> Service<http::Request<B>> for AccessLogService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Display + Send,
    B: http_body::Body<Data = Bytes> + From<Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
    ResBody: From<String> + Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = AccessLogFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let started = Instant::now();

        let ctx = RequestContext::new();
        let request_id = resolve_request_id(req.headers());
        ctx.set_request_id(request_id.clone());
        if let Some(ip) = client_ip(&req) {
            ctx.set_ip(ip);
        }
        req.extensions_mut().insert(ctx.clone());

        let meta = RequestMeta::from_request(&req);
        let logger = self.logger.clone();
        let buffer_body = logger.captures_body() && logger.should_log(&meta.path);
        let body_limit = self.max_request_bytes.unwrap_or(usize::MAX);

        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            let mut captured: Option<Bytes> = None;
            let req = if buffer_body {
                let (parts, body) = req.into_parts();
                match Limited::new(body, body_limit).collect().await {
                    Ok(collected) => {
                        let bytes = collected.to_bytes();
                        captured = Some(bytes.clone());
                        Ok(http::Request::from_parts(parts, B::from(bytes)))
                    }
                    Err(e) if e.is::<LengthLimitError>() => {
                        warn!(path = %meta.path, limit = body_limit, "request body too large");
                        Err(payload_too_large())
                    }
                    Err(e) => {
                        warn!(path = %meta.path, "failed to read request body: {e}");
                        Err(invalid_body())
                    }
                }
            } else {
                Ok(req)
            };

            let mut response = match req {
                Ok(req) => {
                    match AssertUnwindSafe(async move { inner.call(req).await })
                        .catch_unwind()
                        .await
                    {
                        Ok(Ok(response)) => response,
                        Ok(Err(e)) => {
                            error!(path = %meta.path, "request handler failed: {e}");
                            internal_error()
                        }
                        Err(_) => {
                            error!(path = %meta.path, "request handler panicked");
                            internal_error()
                        }
                    }
                }
                Err(response) => response,
            };

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }

            let entry = AccessEntry {
                ctx: &ctx,
                method: &meta.method,
                path: &meta.path,
                query: meta.query.as_deref(),
                status: response.status().as_u16(),
                duration: started.elapsed(),
                user_agent: meta.user_agent.as_deref(),
                content_type: meta.content_type.as_deref(),
                body: captured.as_deref(),
            };
            // A failing sink must not take the response down with it
            if std::panic::catch_unwind(AssertUnwindSafe(|| logger.log(&entry))).is_err() {
                warn!(path = %meta.path, "access log sink panicked");
            }

            Ok(response)
        })
    }
}

fn payload_too_large<B: From<String>>() -> http::Response<B> {
    ApiResponse::error("Payload too large.", http::StatusCode::PAYLOAD_TOO_LARGE).into_http()
}

fn invalid_body<B: From<String>>() -> http::Response<B> {
    ApiResponse::error("Invalid request body.", http::StatusCode::BAD_REQUEST).into_http()
}

fn internal_error<B: From<String>>() -> http::Response<B> {
    GatewayError::Internal("unhandled failure".to_string())
        .to_envelope()
        .into_http()
}
