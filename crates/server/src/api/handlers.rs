use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum_extra::extract::Query;
use chrono::DateTime;

use herald_core::{HeraldError, RawNotification};

use crate::error::ApiError;

use super::schemas::{
    CancelRequest, ListQuery, ListResponse, NotificationView, RescheduleRequest,
    SendNotificationRequest,
};
use super::{ApiState, tenant_runtime};

/// `POST /v1/notifications` -- validate, dispatch if due, persist.
pub async fn send(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<NotificationView>, ApiError> {
    let runtime = tenant_runtime(&state, request.tenant_id.as_deref(), &headers).await?;

    let scheduled_for = request
        .scheduled_time
        .as_deref()
        .map(parse_rfc3339)
        .transpose()?;

    let raw = RawNotification {
        kind: request.kind,
        recipient: request.recipient,
        subject: request.subject,
        message: request.message,
        attachments: request
            .attachments
            .into_iter()
            .map(super::schemas::WireAttachment::into_raw)
            .collect(),
        scheduled_for,
    };

    let notification = state.notifications.send(&runtime, raw).await?;
    Ok(Json(notification.into()))
}

/// `GET /v1/notifications/{id}` -- fetch one notification.
pub async fn get_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<NotificationView>, ApiError> {
    let runtime = tenant_runtime(&state, None, &headers).await?;
    let notification = state.notifications.get_status(&runtime, &id).await?;
    Ok(Json(notification.into()))
}

/// `GET /v1/notifications` -- list, optionally filtered by repeated `status`
/// query parameters.
pub async fn list(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, ApiError> {
    let runtime = tenant_runtime(&state, query.tenant_id.as_deref(), &headers).await?;
    let notifications = state.notifications.list(&runtime, &query.status).await?;
    Ok(Json(ListResponse {
        notifications: notifications.into_iter().map(NotificationView::from).collect(),
    }))
}

/// `PATCH /v1/notifications/{id}/schedule` -- move a queued notification.
pub async fn reschedule(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<NotificationView>, ApiError> {
    let runtime = tenant_runtime(&state, request.tenant_id.as_deref(), &headers).await?;
    let target = parse_rfc3339(&request.scheduled_time)?.with_timezone(&chrono::Utc);
    let notification = state.notifications.reschedule(&runtime, &id, target).await?;
    Ok(Json(notification.into()))
}

/// `POST /v1/notifications/{id}/cancel` -- cancel a queued notification.
pub async fn cancel(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<NotificationView>, ApiError> {
    let payload_tenant = body.as_ref().and_then(|Json(b)| b.tenant_id.clone());
    let runtime = tenant_runtime(&state, payload_tenant.as_deref(), &headers).await?;
    let notification = state.notifications.cancel(&runtime, &id).await?;
    Ok(Json(notification.into()))
}

fn parse_rfc3339(value: &str) -> Result<chrono::DateTime<chrono::FixedOffset>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|_| HeraldError::invalid_argument("scheduled_time must be RFC3339").into())
}
