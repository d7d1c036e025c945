use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herald_core::{Attachment, Notification, RawAttachment, attachment::base64_bytes};

/// `POST /v1/notifications` request body.
#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// `email` or `sms`.
    #[serde(rename = "type")]
    pub kind: String,
    pub recipient: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    /// RFC 3339 instant; omitted means "send immediately".
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub attachments: Vec<WireAttachment>,
}

/// `PATCH /v1/notifications/{id}/schedule` request body.
#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub scheduled_time: String,
}

/// `POST /v1/notifications/{id}/cancel` request body (optional).
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// List filter: `status` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub status: Vec<String>,
}

/// An attachment on the wire: payload travels base64-encoded, and is copied
/// into an owned buffer on both ingest and egress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireAttachment {
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl WireAttachment {
    pub fn into_raw(self) -> RawAttachment {
        RawAttachment {
            filename: self.filename,
            content_type: self.content_type,
            data: self.data,
        }
    }

    fn from_attachment(attachment: Attachment) -> Self {
        Self {
            filename: attachment.filename,
            content_type: Some(attachment.content_type),
            data: attachment.data,
        }
    }
}

/// A notification as returned by every API operation.
#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub notification_id: String,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub status: String,
    pub provider_message_id: Option<String>,
    pub retry_count: u32,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attachments: Vec<WireAttachment>,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        Self {
            notification_id: notification.id.to_string(),
            tenant_id: notification.tenant_id.to_string(),
            kind: notification.kind.as_str().to_owned(),
            recipient: notification.recipient,
            subject: notification.subject,
            message: notification.message,
            status: notification.status.as_str().to_owned(),
            provider_message_id: notification.provider_message_id,
            retry_count: notification.retry_count,
            scheduled_time: notification.scheduled_for,
            last_attempted_at: notification.last_attempted_at,
            created_at: notification.created_at,
            updated_at: notification.updated_at,
            attachments: notification
                .attachments
                .into_iter()
                .map(WireAttachment::from_attachment)
                .collect(),
        }
    }
}

/// `GET /v1/notifications` response body.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub notifications: Vec<NotificationView>,
}
