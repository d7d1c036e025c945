use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::Query;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use herald_core::RuntimeConfig;

use crate::error::WebError;

use super::WebState;
use crate::api::schemas::{ListResponse, NotificationView};

/// Query parameters of the list endpoint; `status` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Vec<String>,
}

/// Query parameters of the schedule/cancel endpoints.
///
/// The acting tenant comes from `tenant_id`, letting a privileged UI served
/// from one host act on behalf of a sibling tenant.
#[derive(Debug, Default, Deserialize)]
pub struct ActingTenantQuery {
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// `PATCH /api/notifications/{id}/schedule` request body.
#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
    pub scheduled_time: Option<String>,
}

/// `GET /healthz` -- liveness, no auth, no tenant resolution.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /runtime-config` -- browser bootstrap data for the resolved tenant.
pub async fn runtime_config(
    State(state): State<WebState>,
    Extension(runtime): Extension<RuntimeConfig>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "apiBaseUrl": state.info.api_base_url,
        "tauthBaseUrl": state.info.tauth_base_url,
        "tauthTenantId": state.info.tauth_tenant_id,
        "googleClientId": state.info.google_client_id,
        "tenant": {
            "id": runtime.tenant.id.as_str(),
            "displayName": runtime.tenant.display_name,
        },
    }))
}

/// `GET /api/notifications` -- the host tenant's notifications.
pub async fn list(
    State(state): State<WebState>,
    Extension(runtime): Extension<RuntimeConfig>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, WebError> {
    let notifications = state
        .notifications
        .list(&runtime, &query.status)
        .await
        .map_err(WebError::from)?;
    Ok(Json(ListResponse {
        notifications: notifications.into_iter().map(NotificationView::from).collect(),
    }))
}

/// `PATCH /api/notifications/{id}/schedule?tenant_id=` -- reschedule on
/// behalf of the query-selected tenant.
pub async fn reschedule(
    State(state): State<WebState>,
    Path(id): Path<String>,
    Query(query): Query<ActingTenantQuery>,
    body: Option<Json<ScheduleBody>>,
) -> Result<Json<NotificationView>, WebError> {
    let id = require_id(&id)?;
    let runtime = acting_runtime(&state, query.tenant_id.as_deref()).await?;

    let target = body
        .and_then(|Json(b)| b.scheduled_time)
        .ok_or(WebError::ScheduleFormat)?;
    let target = DateTime::parse_from_rfc3339(&target)
        .map_err(|_| WebError::ScheduleFormat)?
        .with_timezone(&Utc);

    let notification = state
        .notifications
        .reschedule(&runtime, id, target)
        .await
        .map_err(WebError::from)?;
    Ok(Json(notification.into()))
}

/// `POST /api/notifications/{id}/cancel?tenant_id=` -- cancel on behalf of
/// the query-selected tenant.
pub async fn cancel(
    State(state): State<WebState>,
    Path(id): Path<String>,
    Query(query): Query<ActingTenantQuery>,
) -> Result<Json<NotificationView>, WebError> {
    let id = require_id(&id)?;
    let runtime = acting_runtime(&state, query.tenant_id.as_deref()).await?;

    let notification = state
        .notifications
        .cancel(&runtime, id)
        .await
        .map_err(WebError::from)?;
    Ok(Json(notification.into()))
}

fn require_id(id: &str) -> Result<&str, WebError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(WebError::NotificationIdRequired);
    }
    Ok(trimmed)
}

async fn acting_runtime(
    state: &WebState,
    tenant_id: Option<&str>,
) -> Result<RuntimeConfig, WebError> {
    let tenant_id = tenant_id.map(str::trim).filter(|s| !s.is_empty());
    let Some(tenant_id) = tenant_id else {
        return Err(WebError::TenantIdRequired);
    };
    state.resolver.resolve_by_id(tenant_id).await.map_err(|e| match e {
        herald_runtime::ResolveError::Storage(_) => WebError::Internal,
        _ => WebError::TenantNotFound,
    })
}
