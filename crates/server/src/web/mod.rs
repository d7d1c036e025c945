//! The tenant web front door.
//!
//! Serves the browser UI's API: session-cookie authenticated notification
//! management plus the public runtime-config and health endpoints. The
//! tenant is resolved from the request `Host` header; `/healthz` bypasses
//! both tenant resolution and sessions.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, HOST};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;
use tracing::warn;

use herald_gateway::Notifications;
use herald_runtime::RuntimeResolver;

use crate::error::WebError;
use crate::session::{SessionValidator, session_cookie};

/// Static values served by `GET /runtime-config` alongside the resolved
/// tenant.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub api_base_url: String,
    pub tauth_base_url: String,
    pub tauth_tenant_id: String,
    pub google_client_id: String,
}

/// Shared state of the web surface.
#[derive(Clone)]
pub struct WebState {
    pub notifications: Arc<Notifications>,
    pub resolver: Arc<RuntimeResolver>,
    pub session: Arc<dyn SessionValidator>,
    pub info: Arc<RuntimeInfo>,
}

/// Build the web router.
pub fn router(state: WebState) -> Router {
    let session_routes = Router::new()
        .route("/api/notifications", get(handlers::list))
        .route("/api/notifications/{id}/schedule", patch(handlers::reschedule))
        .route("/api/notifications/{id}/cancel", post(handlers::cancel))
        .layer(middleware::from_fn_with_state(state.clone(), require_session));

    let tenant_routes = session_routes
        .merge(Router::new().route("/runtime-config", get(handlers::runtime_config)))
        .layer(middleware::from_fn_with_state(state.clone(), tenant_by_host));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(tenant_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the tenant owning the request `Host` and stash its runtime in
/// the request extensions. Unknown hosts are a 404, not a 401: the caller
/// reached a hostname this deployment does not serve.
pub async fn tenant_by_host(
    State(state): State<WebState>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match state.resolver.resolve_by_host(host).await {
        Ok(runtime) => {
            request.extensions_mut().insert(runtime);
            next.run(request).await
        }
        Err(error) => {
            warn!(error = %error, "host did not resolve to a tenant");
            WebError::TenantNotFound.into_response()
        }
    }
}

/// Require a valid `app_session` cookie on `/api` routes.
pub async fn require_session(
    State(state): State<WebState>,
    request: Request,
    next: Next,
) -> Response {
    let session = request
        .headers()
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(session_cookie);

    let Some(session) = session else {
        return WebError::Unauthorized.into_response();
    };

    match state.session.validate(&session).await {
        Ok(()) => next.run(request).await,
        Err(_) => WebError::Unauthorized.into_response(),
    }
}
