use chrono::{DateTime, Utc};

use herald_core::{
    Attachment, Notification, NotificationStatus, NotificationType, Tenant, TenantStatus,
};

use crate::error::StoreError;

/// A `tenants` table row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantRow {
    pub id: String,
    pub display_name: String,
    pub support_email: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantRow {
    pub fn into_tenant(self) -> Result<Tenant, StoreError> {
        let status = TenantStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown tenant status {:?}", self.status)))?;
        Ok(Tenant {
            id: self.id.into(),
            display_name: self.display_name,
            support_email: self.support_email,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// An `email_profiles` table row. Secret columns hold vault ciphertext.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailProfileRow {
    pub tenant_id: String,
    pub host: String,
    pub port: i64,
    pub username_ct: Vec<u8>,
    pub password_ct: Vec<u8>,
    pub from_address: String,
}

/// An `sms_profiles` table row. Secret columns hold vault ciphertext.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SmsProfileRow {
    pub tenant_id: String,
    pub account_sid_ct: Vec<u8>,
    pub auth_token_ct: Vec<u8>,
    pub from_number: String,
}

/// A `notifications` table row, before status canonicalization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub tenant_id: String,
    pub notification_id: String,
    pub kind: String,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub status: String,
    pub provider_message_id: Option<String>,
    pub retry_count: i64,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationRow {
    /// Map the row onto the domain model.
    ///
    /// Status parsing canonicalizes legacy `failed` rows to `errored`; an
    /// unrecognized status or kind is reported as a corrupt row rather than
    /// silently skipped.
    pub fn into_notification(self, attachments: Vec<Attachment>) -> Result<Notification, StoreError> {
        let kind = NotificationType::parse(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown notification kind {:?}", self.kind)))?;
        let status = NotificationStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown notification status {:?}", self.status))
        })?;
        let retry_count = u32::try_from(self.retry_count)
            .map_err(|_| StoreError::Corrupt(format!("negative retry count {}", self.retry_count)))?;

        Ok(Notification {
            tenant_id: self.tenant_id.into(),
            id: self.notification_id.into(),
            kind,
            recipient: self.recipient,
            subject: self.subject,
            message: self.message,
            status,
            provider_message_id: self.provider_message_id,
            retry_count,
            last_attempted_at: self.last_attempted_at,
            scheduled_for: self.scheduled_for,
            created_at: self.created_at,
            updated_at: self.updated_at,
            attachments,
        })
    }
}

/// A `notification_attachments` table row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttachmentRow {
    pub notification_id: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl AttachmentRow {
    pub fn into_attachment(self) -> Attachment {
        Attachment {
            filename: self.filename,
            content_type: self.content_type,
            data: self.data,
        }
    }
}
