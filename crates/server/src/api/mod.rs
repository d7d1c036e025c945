//! The notification API front door.
//!
//! Carries the five service operations over authenticated JSON: every route
//! requires a `Bearer` token, resolves the acting tenant from the request
//! payload or the `x-tenant-id` header, and maps the error taxonomy onto
//! HTTP status codes.

pub mod auth;
pub mod handlers;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::middleware;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

use herald_core::{HeraldError, RuntimeConfig, log_digest};
use herald_gateway::Notifications;
use herald_runtime::RuntimeResolver;

use crate::error::ApiError;

/// Maximum accepted request body: the 25 MiB attachment ceiling plus
/// envelope and base64 overhead.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Header carrying the tenant id when the payload does not.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Shared state of the API surface.
#[derive(Clone)]
pub struct ApiState {
    pub notifications: Arc<Notifications>,
    pub resolver: Arc<RuntimeResolver>,
    pub bearer_token: Arc<str>,
}

/// Build the API router with auth middleware and body limits applied.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/v1/notifications",
            post(handlers::send).get(handlers::list),
        )
        .route("/v1/notifications/{id}", get(handlers::get_status))
        .route("/v1/notifications/{id}/schedule", patch(handlers::reschedule))
        .route("/v1/notifications/{id}/cancel", post(handlers::cancel))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the acting tenant runtime from the payload's tenant field or the
/// `x-tenant-id` header, in that order.
pub(crate) async fn tenant_runtime(
    state: &ApiState,
    payload_tenant: Option<&str>,
    headers: &HeaderMap,
) -> Result<RuntimeConfig, ApiError> {
    let from_payload = payload_tenant.map(str::trim).filter(|s| !s.is_empty());
    let from_header = headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let Some(tenant_id) = from_payload.or(from_header) else {
        return Err(HeraldError::invalid_argument("tenant_id is required").into());
    };

    let runtime = state.resolver.resolve_by_id(tenant_id).await?;
    tracing::debug!(tenant = %log_digest(tenant_id), "tenant runtime established");
    Ok(runtime)
}
