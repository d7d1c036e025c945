use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use herald_core::HeraldError;
use herald_runtime::ResolveError;

/// Error wrapper for the notification API surface.
///
/// Renders the taxonomy as `{"error": "<code>"}` with the matching status
/// code. Messages never carry secrets or recipient addresses.
#[derive(Debug)]
pub struct ApiError(pub HeraldError);

impl From<HeraldError> for ApiError {
    fn from(value: HeraldError) -> Self {
        Self(value)
    }
}

impl From<ResolveError> for ApiError {
    fn from(value: ResolveError) -> Self {
        Self(map_resolve(value))
    }
}

/// Fold resolver errors into the shared taxonomy.
pub fn map_resolve(error: ResolveError) -> HeraldError {
    match error {
        ResolveError::EmptyHost => HeraldError::invalid_argument("empty host"),
        ResolveError::InvalidTenantId => HeraldError::invalid_argument("tenant_id is required"),
        ResolveError::NotFound => HeraldError::NotFound,
        ResolveError::Decrypt(_) => HeraldError::CredentialDecryptFailed,
        ResolveError::Storage(detail) => HeraldError::internal(detail),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HeraldError::Unauthenticated => StatusCode::UNAUTHORIZED,
            HeraldError::InvalidArgument(_)
            | HeraldError::MissingTenantContext
            | HeraldError::ScheduleInPast
            | HeraldError::SmsDisabled
            | HeraldError::Attachments(_) => StatusCode::BAD_REQUEST,
            HeraldError::NotFound => StatusCode::NOT_FOUND,
            HeraldError::NotEditable => StatusCode::CONFLICT,
            HeraldError::CredentialDecryptFailed | HeraldError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.0.code() }));
        (status, body).into_response()
    }
}

/// Errors of the tenant web surface, with its fixed error vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebError {
    TenantNotFound,
    Unauthorized,
    NotificationIdRequired,
    TenantIdRequired,
    ScheduleFormat,
    SchedulePast,
    NotEditable,
    NotificationNotFound,
    Internal,
}

impl WebError {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::TenantNotFound => "tenant_not_found",
            Self::Unauthorized => "unauthorized",
            Self::NotificationIdRequired => "notification_id is required",
            Self::TenantIdRequired => "tenant_id is required",
            Self::ScheduleFormat => "scheduled_time must be RFC3339",
            Self::SchedulePast => "scheduled_time must be in the future",
            Self::NotEditable => "notification can only be edited while queued",
            Self::NotificationNotFound => "notification not found",
            Self::Internal => "internal server error",
        }
    }

    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::TenantNotFound | Self::NotificationNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotificationIdRequired
            | Self::TenantIdRequired
            | Self::ScheduleFormat
            | Self::SchedulePast => StatusCode::BAD_REQUEST,
            Self::NotEditable => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HeraldError> for WebError {
    fn from(value: HeraldError) -> Self {
        match value {
            HeraldError::NotFound => Self::NotificationNotFound,
            HeraldError::NotEditable => Self::NotEditable,
            HeraldError::ScheduleInPast => Self::SchedulePast,
            _ => Self::Internal,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.code() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_mapping() {
        let cases = [
            (HeraldError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (HeraldError::invalid_argument("x"), StatusCode::BAD_REQUEST),
            (HeraldError::NotFound, StatusCode::NOT_FOUND),
            (HeraldError::NotEditable, StatusCode::CONFLICT),
            (HeraldError::ScheduleInPast, StatusCode::BAD_REQUEST),
            (HeraldError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            let response = ApiError(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn web_error_vocabulary() {
        assert_eq!(WebError::TenantNotFound.code(), "tenant_not_found");
        assert_eq!(WebError::SchedulePast.code(), "scheduled_time must be in the future");
        assert_eq!(WebError::from(HeraldError::NotEditable), WebError::NotEditable);
        assert_eq!(WebError::from(HeraldError::internal("x")), WebError::Internal);
        assert_eq!(WebError::NotEditable.status(), StatusCode::CONFLICT);
    }
}
