//! # sApi Core
//!
//! Foundation crate for the sApi gateway. It holds the three types every other
//! crate in the workspace agrees on:
//!
//! - [`RequestContext`] - a per-request key/value bag shared by the auth gateway,
//!   handlers and the logging pipeline
//! - [`ApiResponse`] - the `{success, message, object, code}` envelope returned by
//!   every endpoint
//! - [`GatewayError`] - the HTTP-facing error taxonomy (401/403/404/422/500)
//!
//! ## Request Context Lifecycle
//!
//! A context is created when a request enters the stack, travels in the request
//! extensions, and is dropped with the request. Clones taken during one request
//! share state; nothing is ever stored in a process-wide slot.
//!
//! ```rust
//! use sapi_core::RequestContext;
//!
//! let ctx = RequestContext::with_request_id("req-1");
//! let view = ctx.clone();
//! ctx.set_sub("alice");
//! assert_eq!(view.sub().as_deref(), Some("alice"));
//! ```
//!
//! ## Feature Flags
//!
//! - `axum` - `IntoResponse` implementations for [`ApiResponse`] and [`GatewayError`]

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod context;
pub mod envelope;
pub mod error;

#[doc(inline)]
pub use context::{RequestContext, keys};
#[doc(inline)]
pub use envelope::ApiResponse;
#[doc(inline)]
pub use error::{GatewayError, GatewayResult};

/// Header carrying the correlation id on requests and responses
pub const REQUEST_ID_HEADER: &str = "x-request-id";
