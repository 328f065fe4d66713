//! # sApi Auth - Bearer Token Issuing and Verification
//!
//! A deliberately small authentication layer: one shared secret, HS256
//! signatures, and a flat scope model.
//!
//! ## Design Principles
//!
//! - **One Codec**: a single [`TokenCodec`] implementation for compact HS256 JWS
//! - **Opaque Failures**: every decode failure is the same [`TokenError::Invalid`]
//! - **Immutable Claims**: verification accepts or rejects, it never rewrites claims
//! - **Per-Request State**: identity flows through [`sapi_core::RequestContext`]
//!
//! ## Architecture
//!
//! - [`jwt`] - [`Claims`] and the HS256 [`TokenCodec`]
//! - [`validation`] - [`ClaimValidator`] and its [`ValidationPolicy`]
//! - [`scopes`] - scope normalization and the `allow` check
//! - [`issuer`] - [`TokenIssuer`], which applies claim defaults and signs
//! - [`config`] - [`AuthConfig`] (secret, ttl, default scopes, issuer)
//! - [`policy`] - pluggable [`AccessPolicy`] strategies for the token endpoint
//! - [`users`] - the [`UserProvider`] credential capability
//! - [`tower`] - the [`AuthGatewayLayer`] bearer-token middleware
//!
//! ## Quick Start
//!
//! ```rust
//! use sapi_auth::{AuthConfig, Claims, ClaimValidator, TokenCodec, TokenIssuer};
//!
//! let config = AuthConfig::builder()
//!     .secret("change-me")
//!     .ttl_seconds(60)
//!     .build();
//!
//! let issuer = TokenIssuer::new(config.clone());
//! let token = issuer.issue("alice", Claims::new(), None).unwrap();
//!
//! let codec = TokenCodec::new(config.secret_bytes().unwrap());
//! let claims = codec.decode(&token).unwrap();
//! ClaimValidator::new(config.validation_policy()).validate(&claims).unwrap();
//! assert_eq!(claims.sub(), Some("alice"));
//! ```
//!
//! ## Feature Flags
//!
//! - `middleware` (default) - Tower layer and service for HTTP requests

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod issuer;
pub mod jwt;
pub mod policy;
pub mod scopes;
pub mod users;
pub mod validation;

#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;

#[doc(inline)]
pub use config::{AuthConfig, AuthConfigBuilder, DEFAULT_TTL_SECONDS};
#[doc(inline)]
pub use error::{AuthError, TokenError};
#[doc(inline)]
pub use issuer::TokenIssuer;
#[doc(inline)]
pub use jwt::{Claims, TokenCodec};
#[doc(inline)]
pub use policy::{AccessPolicy, AllowlistPolicy, OpenPolicy, PolicyConfig, RolePolicy};
#[doc(inline)]
pub use scopes::{WILDCARD_SCOPE, allow};
#[doc(inline)]
pub use users::{StaticUserProvider, UserConfig, UserProvider, UserRecord};
#[doc(inline)]
pub use validation::{ClaimValidator, ValidationPolicy};

#[cfg(feature = "middleware")]
pub use crate::tower::{AuthGatewayLayer, AuthGatewayService};
