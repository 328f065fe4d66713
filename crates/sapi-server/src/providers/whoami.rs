//! Built-in provider reporting the caller's identity

use axum::routing::get;
use axum::{Extension, Router};
use sapi_core::{ApiResponse, RequestContext};
use serde_json::json;

use super::{RouteMount, RouteProvider};

/// Class id of [`WhoamiProvider`]
pub const WHOAMI_CLASS: &str = "sapi.whoami";

/// `GET {mount}` returns `{sub, scopes}` of the authenticated caller
#[derive(Debug, Clone, Copy, Default)]
pub struct WhoamiProvider;

impl RouteProvider for WhoamiProvider {
    fn routes(&self, mount: &RouteMount) -> Router {
        Router::new().route(mount.path(), get(whoami))
    }
}

async fn whoami(Extension(ctx): Extension<RequestContext>) -> ApiResponse {
    ApiResponse::success(json!({
        "sub": ctx.sub(),
        "scopes": ctx.scopes(),
    }))
}
