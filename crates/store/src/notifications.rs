use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use herald_core::{Attachment, Notification, NotificationId, TenantId};

use crate::error::{StoreError, StoreResult};
use crate::model::{AttachmentRow, NotificationRow};

const NOTIFICATION_COLUMNS: &str = "tenant_id, notification_id, kind, recipient, subject, \
     message, status, provider_message_id, retry_count, last_attempted_at, scheduled_for, \
     created_at, updated_at";

/// CRUD over notifications and their attachments, strictly scoped by tenant.
///
/// Every query here filters by `tenant_id` first; a notification created
/// under one tenant is unreachable through any other tenant's calls.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    pool: SqlitePool,
}

impl NotificationStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a notification and its attachments in one transaction.
    pub async fn insert(&self, notification: &Notification) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO notifications (tenant_id, notification_id, kind, recipient, subject, \
             message, status, provider_message_id, retry_count, last_attempted_at, \
             scheduled_for, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(notification.tenant_id.as_str())
        .bind(notification.id.as_str())
        .bind(notification.kind.as_str())
        .bind(&notification.recipient)
        .bind(&notification.subject)
        .bind(&notification.message)
        .bind(notification.status.as_str())
        .bind(&notification.provider_message_id)
        .bind(i64::from(notification.retry_count))
        .bind(notification.last_attempted_at)
        .bind(notification.scheduled_for)
        .bind(notification.created_at)
        .bind(notification.updated_at)
        .execute(&mut *tx)
        .await?;

        for attachment in &notification.attachments {
            sqlx::query(
                "INSERT INTO notification_attachments \
                 (tenant_id, notification_id, filename, content_type, data) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(notification.tenant_id.as_str())
            .bind(notification.id.as_str())
            .bind(&attachment.filename)
            .bind(&attachment.content_type)
            .bind(&attachment.data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch one notification by `(tenant_id, notification_id)`.
    pub async fn get(&self, tenant: &TenantId, id: &NotificationId) -> StoreResult<Notification> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE tenant_id = ? AND notification_id = ?"
        ))
        .bind(tenant.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::NotFound)?;
        let attachments = self.attachments_for(tenant, id).await?;
        row.into_notification(attachments)
    }

    /// Fetch all of a tenant's notifications, newest first.
    pub async fn list(&self, tenant: &TenantId) -> StoreResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE tenant_id = ? ORDER BY created_at DESC, pk DESC"
        ))
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut attachments = self.attachments_for_tenant(tenant).await?;
        rows.into_iter()
            .map(|row| {
                let files = attachments.remove(&row.notification_id).unwrap_or_default();
                row.into_notification(files)
            })
            .collect()
    }

    /// Persist updated status, retry accounting, and schedule fields.
    pub async fn update(&self, notification: &Notification) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET status = ?, provider_message_id = ?, retry_count = ?, \
             last_attempted_at = ?, scheduled_for = ?, updated_at = ? \
             WHERE tenant_id = ? AND notification_id = ?",
        )
        .bind(notification.status.as_str())
        .bind(&notification.provider_message_id)
        .bind(i64::from(notification.retry_count))
        .bind(notification.last_attempted_at)
        .bind(notification.scheduled_for)
        .bind(notification.updated_at)
        .bind(notification.tenant_id.as_str())
        .bind(notification.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Rows eligible for a delivery attempt under the given retry budget.
    ///
    /// The filter admits non-terminal statuses (including legacy `failed`
    /// rows), rows still inside the retry budget, and rows whose schedule is
    /// due. `sent` and `cancelled` rows can never reappear here.
    pub async fn pending(
        &self,
        tenant: &TenantId,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE tenant_id = ? \
               AND status IN ('queued', 'errored', 'failed') \
               AND retry_count < ? \
               AND (scheduled_for IS NULL OR scheduled_for <= ?) \
             ORDER BY created_at ASC"
        ))
        .bind(tenant.as_str())
        .bind(i64::from(max_retries))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut attachments = self.attachments_for_tenant(tenant).await?;
        rows.into_iter()
            .map(|row| {
                let files = attachments.remove(&row.notification_id).unwrap_or_default();
                row.into_notification(files)
            })
            .collect()
    }

    async fn attachments_for(
        &self,
        tenant: &TenantId,
        id: &NotificationId,
    ) -> StoreResult<Vec<Attachment>> {
        let rows: Vec<AttachmentRow> = sqlx::query_as(
            "SELECT notification_id, filename, content_type, data \
             FROM notification_attachments \
             WHERE tenant_id = ? AND notification_id = ? ORDER BY id ASC",
        )
        .bind(tenant.as_str())
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AttachmentRow::into_attachment).collect())
    }

    async fn attachments_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> StoreResult<HashMap<String, Vec<Attachment>>> {
        let rows: Vec<AttachmentRow> = sqlx::query_as(
            "SELECT notification_id, filename, content_type, data \
             FROM notification_attachments WHERE tenant_id = ? ORDER BY id ASC",
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<String, Vec<Attachment>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.notification_id.clone())
                .or_default()
                .push(row.into_attachment());
        }
        Ok(grouped)
    }
}
