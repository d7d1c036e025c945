use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use herald_core::{
    HeraldError, Notification, NotificationRequest, NotificationStatus, NotificationType,
    RawNotification, RuntimeConfig, log_digest,
};
use herald_scheduler::Clock;
use herald_sender::{EmailMessage, SmsMessage};
use herald_store::{NotificationStore, StoreError};

use crate::registry::SenderRegistry;

/// The notification core: owns the state machine and the five public
/// operations.
///
/// Every operation takes the caller's resolved [`RuntimeConfig`] explicitly;
/// every persistence call underneath is scoped by `runtime.tenant.id`.
pub struct Notifications {
    store: NotificationStore,
    registry: Arc<SenderRegistry>,
    clock: Arc<dyn Clock>,
}

impl Notifications {
    #[must_use]
    pub fn new(store: NotificationStore, registry: Arc<SenderRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            registry,
            clock,
        }
    }

    /// Validate, optionally dispatch, and persist a new notification.
    ///
    /// A notification with no schedule (or one already due) is dispatched
    /// synchronously: sender success yields `sent`, sender failure yields
    /// `errored` with the retry count left at zero -- the initial attempt is
    /// not a retry. A sender that cannot be resolved at all (missing
    /// credentials, SMS disabled) fails the call without persisting a row,
    /// so the caller can correct configuration instead of accumulating
    /// unreachable work.
    pub async fn send(
        &self,
        runtime: &RuntimeConfig,
        raw: RawNotification,
    ) -> Result<Notification, HeraldError> {
        let request = NotificationRequest::validate(raw)?;
        let now = self.clock.now();

        let mut notification = Notification {
            tenant_id: runtime.tenant.id.clone(),
            id: Uuid::now_v7().to_string().into(),
            kind: request.kind,
            recipient: request.recipient,
            subject: request.subject,
            message: request.message,
            status: NotificationStatus::Queued,
            provider_message_id: None,
            retry_count: 0,
            last_attempted_at: None,
            scheduled_for: request.scheduled_for,
            created_at: now,
            updated_at: now,
            attachments: request.attachments,
        };

        let due_now = notification.scheduled_for.is_none_or(|at| at <= now);
        if due_now {
            self.dispatch_initial(runtime, &mut notification, now).await?;
        }

        self.store.insert(&notification).await.map_err(map_store)?;

        info!(
            tenant = %runtime.tenant.id,
            notification = %notification.id,
            kind = %notification.kind,
            recipient = %log_digest(&notification.recipient),
            subject = %notification.subject.as_deref().map(log_digest).unwrap_or_default(),
            status = %notification.status,
            "notification accepted"
        );
        Ok(notification)
    }

    /// Fetch one notification by business id.
    pub async fn get_status(
        &self,
        runtime: &RuntimeConfig,
        id: &str,
    ) -> Result<Notification, HeraldError> {
        if id.trim().is_empty() {
            return Err(HeraldError::invalid_argument("notification_id is required"));
        }
        self.store
            .get(&runtime.tenant.id, &id.into())
            .await
            .map_err(map_store)
    }

    /// All of the tenant's notifications, newest first, optionally filtered
    /// by status labels. Filters are normalized, so `errored` also matches
    /// rows persisted under the legacy `failed` label.
    pub async fn list(
        &self,
        runtime: &RuntimeConfig,
        statuses: &[String],
    ) -> Result<Vec<Notification>, HeraldError> {
        let mut filters = Vec::with_capacity(statuses.len());
        for label in statuses {
            let status = NotificationStatus::parse(label).ok_or_else(|| {
                HeraldError::invalid_argument(format!("unknown status filter {label:?}"))
            })?;
            filters.push(status);
        }

        let notifications = self.store.list(&runtime.tenant.id).await.map_err(map_store)?;
        if filters.is_empty() {
            return Ok(notifications);
        }
        Ok(notifications
            .into_iter()
            .filter(|n| filters.contains(&n.status))
            .collect())
    }

    /// Move a queued notification to a new future schedule.
    pub async fn reschedule(
        &self,
        runtime: &RuntimeConfig,
        id: &str,
        new_time: DateTime<Utc>,
    ) -> Result<Notification, HeraldError> {
        if id.trim().is_empty() {
            return Err(HeraldError::invalid_argument("notification_id is required"));
        }
        let now = self.clock.now();
        if new_time <= now {
            return Err(HeraldError::ScheduleInPast);
        }

        let mut notification = self
            .store
            .get(&runtime.tenant.id, &id.into())
            .await
            .map_err(map_store)?;
        if notification.status != NotificationStatus::Queued {
            return Err(HeraldError::NotEditable);
        }

        notification.scheduled_for = Some(new_time);
        notification.updated_at = now;
        self.store.update(&notification).await.map_err(map_store)?;
        Ok(notification)
    }

    /// Cancel a queued notification.
    pub async fn cancel(
        &self,
        runtime: &RuntimeConfig,
        id: &str,
    ) -> Result<Notification, HeraldError> {
        if id.trim().is_empty() {
            return Err(HeraldError::invalid_argument("notification_id is required"));
        }
        let mut notification = self
            .store
            .get(&runtime.tenant.id, &id.into())
            .await
            .map_err(map_store)?;
        if notification.status != NotificationStatus::Queued {
            return Err(HeraldError::NotEditable);
        }

        notification.status = NotificationStatus::Cancelled;
        notification.scheduled_for = None;
        notification.updated_at = self.clock.now();
        self.store.update(&notification).await.map_err(map_store)?;
        Ok(notification)
    }

    async fn dispatch_initial(
        &self,
        runtime: &RuntimeConfig,
        notification: &mut Notification,
        now: DateTime<Utc>,
    ) -> Result<(), HeraldError> {
        let outcome = match notification.kind {
            NotificationType::Email => {
                let sender = self.registry.email_sender_for(runtime)?;
                sender
                    .send_email(&EmailMessage {
                        to: notification.recipient.clone(),
                        subject: notification.subject.clone().unwrap_or_default(),
                        body: notification.message.clone(),
                        attachments: notification.attachments.clone(),
                    })
                    .await
            }
            NotificationType::Sms => {
                let sender = self.registry.sms_sender_for(runtime)?;
                sender
                    .send_sms(&SmsMessage {
                        to: notification.recipient.clone(),
                        body: notification.message.clone(),
                    })
                    .await
            }
        };

        match outcome {
            Ok(receipt) => {
                notification.status = NotificationStatus::Sent;
                notification.provider_message_id = receipt.provider_message_id;
            }
            Err(e) => {
                warn!(
                    tenant = %runtime.tenant.id,
                    notification = %notification.id,
                    recipient = %log_digest(&notification.recipient),
                    error = %e,
                    "initial delivery attempt failed"
                );
                notification.status = NotificationStatus::Errored;
            }
        }
        notification.last_attempted_at = Some(now);
        notification.updated_at = now;
        Ok(())
    }
}

fn map_store(error: StoreError) -> HeraldError {
    match error {
        StoreError::NotFound => HeraldError::NotFound,
        other => HeraldError::internal(other.to_string()),
    }
}
