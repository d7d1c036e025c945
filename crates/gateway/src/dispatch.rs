use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use herald_core::{HeraldError, Notification, NotificationStatus, NotificationType, log_digest};
use herald_runtime::RuntimeResolver;
use herald_scheduler::{Attempt, DispatchError, Dispatcher, Job, JobUpdate, PendingSource, SchedulerError};
use herald_sender::{EmailMessage, SmsMessage};
use herald_store::NotificationStore;

use crate::registry::SenderRegistry;

/// Snapshot provider for the retry scheduler: enumerates active tenants and
/// wraps each eligible notification as a job whose payload carries the full
/// record, so the dispatcher needs no further reads.
pub struct NotificationPendingSource {
    store: NotificationStore,
    resolver: Arc<RuntimeResolver>,
}

impl NotificationPendingSource {
    #[must_use]
    pub fn new(store: NotificationStore, resolver: Arc<RuntimeResolver>) -> Self {
        Self { store, resolver }
    }
}

#[async_trait]
impl PendingSource<Notification> for NotificationPendingSource {
    async fn pending(
        &self,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job<Notification>>, SchedulerError> {
        let tenants = self
            .resolver
            .list_active_tenants()
            .await
            .map_err(|e| SchedulerError::Scan(e.to_string()))?;

        let mut jobs = Vec::new();
        for tenant in tenants {
            let rows = self
                .store
                .pending(&tenant.id, max_retries, now)
                .await
                .map_err(|e| SchedulerError::Scan(e.to_string()))?;
            for notification in rows {
                jobs.push(Job {
                    // Business ids repeat across tenants; key jobs by both.
                    id: format!("{}/{}", notification.tenant_id, notification.id),
                    scheduled_for: notification.scheduled_for,
                    retry_count: notification.retry_count,
                    last_attempted_at: notification.last_attempted_at,
                    payload: notification,
                });
            }
        }
        Ok(jobs)
    }

    async fn apply(
        &self,
        job: &Job<Notification>,
        update: &JobUpdate,
    ) -> Result<(), SchedulerError> {
        let status = NotificationStatus::parse(&update.status)
            .ok_or_else(|| SchedulerError::Apply(format!("unknown status {:?}", update.status)))?;

        let mut notification = job.payload.clone();
        notification.status = status;
        if let Some(provider_id) = &update.provider_message_id {
            notification.provider_message_id = Some(provider_id.clone());
        }
        notification.retry_count = update.retry_count;
        notification.last_attempted_at = Some(update.last_attempted_at);
        notification.updated_at = update.last_attempted_at;

        self.store
            .update(&notification)
            .await
            .map_err(|e| SchedulerError::Apply(e.to_string()))
    }
}

/// Scheduler-facing adapter performing one delivery attempt.
///
/// Establishes the tenant runtime fresh through the resolver (reading
/// through its cache) rather than capturing one at startup, picks the sender
/// by notification type, and maps handled failures such as `sms_disabled` to
/// an `errored` outcome. Transport errors propagate as dispatch errors so
/// the scheduler applies its failure status.
pub struct NotificationDispatcher {
    resolver: Arc<RuntimeResolver>,
    registry: Arc<SenderRegistry>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(resolver: Arc<RuntimeResolver>, registry: Arc<SenderRegistry>) -> Self {
        Self { resolver, registry }
    }
}

#[async_trait]
impl Dispatcher<Notification> for NotificationDispatcher {
    async fn attempt(&self, job: &Job<Notification>) -> Result<Attempt, DispatchError> {
        let notification = &job.payload;
        let runtime = self
            .resolver
            .resolve_by_id(notification.tenant_id.as_str())
            .await
            .map_err(|e| DispatchError(e.to_string()))?;

        let sender_outcome = match notification.kind {
            NotificationType::Email => match self.registry.email_sender_for(&runtime) {
                Ok(sender) => {
                    sender
                        .send_email(&EmailMessage {
                            to: notification.recipient.clone(),
                            subject: notification.subject.clone().unwrap_or_default(),
                            body: notification.message.clone(),
                            attachments: notification.attachments.clone(),
                        })
                        .await
                }
                Err(e) => return Ok(handled_failure(notification, &e)),
            },
            NotificationType::Sms => match self.registry.sms_sender_for(&runtime) {
                Ok(sender) => {
                    sender
                        .send_sms(&SmsMessage {
                            to: notification.recipient.clone(),
                            body: notification.message.clone(),
                        })
                        .await
                }
                Err(e) => return Ok(handled_failure(notification, &e)),
            },
        };

        match sender_outcome {
            Ok(receipt) => Ok(Attempt::delivered(receipt.provider_message_id)),
            Err(e) => Err(DispatchError(e.to_string())),
        }
    }
}

/// A sender that cannot be resolved (SMS disabled, incomplete credentials)
/// still consumes a retry; the attempt lands as `errored` instead of
/// propagating a transport error.
fn handled_failure(notification: &Notification, error: &HeraldError) -> Attempt {
    warn!(
        tenant = %notification.tenant_id,
        notification = %notification.id,
        recipient = %log_digest(&notification.recipient),
        error = %error,
        "sender unavailable; marking attempt errored"
    );
    Attempt::with_status(NotificationStatus::Errored.as_str())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use herald_core::RawNotification;
    use herald_crypto::SecretVault;
    use herald_scheduler::{Clock, ManualClock, Scheduler, SchedulerConfig};
    use herald_store::{
        Bootstrap, EmailProfileSpec, SmsProfileSpec, TenantSpec, TenantStore, connect_in_memory,
    };

    use super::*;
    use crate::service::Notifications;
    use crate::testing::{MemoryEmailSender, MemorySmsSender, runtime_config};

    struct Harness {
        notifications: Arc<Notifications>,
        scheduler: Scheduler<Notification>,
        clock: Arc<ManualClock>,
        email: Arc<MemoryEmailSender>,
        sms: Arc<MemorySmsSender>,
    }

    fn spec(id: &str, sms: bool) -> TenantSpec {
        TenantSpec {
            id: id.to_owned(),
            display_name: format!("Tenant {id}"),
            support_email: None,
            enabled: true,
            domains: vec![format!("{id}.example")],
            email_profile: EmailProfileSpec {
                host: "smtp.example.com".to_owned(),
                port: 587,
                username: "u".to_owned(),
                password: "p".to_owned(),
                from: format!("no-reply@{id}.example"),
            },
            sms_profile: sms.then(|| SmsProfileSpec {
                account_sid: "AC1".to_owned(),
                auth_token: "tok".to_owned(),
                from_number: "+15550001111".to_owned(),
            }),
            status: None,
        }
    }

    async fn harness(email: MemoryEmailSender, sms: MemorySmsSender) -> Harness {
        let pool = connect_in_memory().await.unwrap();
        let vault = Arc::new(SecretVault::from_hex(&"33".repeat(32)).unwrap());
        let resolver = Arc::new(RuntimeResolver::new(
            TenantStore::new(pool.clone()),
            vault.clone(),
        ));
        let mut bootstrap = Bootstrap::new(pool.clone(), vault);
        bootstrap.register(resolver.clone());
        bootstrap
            .apply(&[spec("t1", true), spec("t2", false)])
            .await
            .unwrap();

        let email = Arc::new(email);
        let sms = Arc::new(sms);
        let registry = Arc::new(
            SenderRegistry::new()
                .with_default_email_sender(email.clone())
                .with_default_sms_sender(sms.clone()),
        );
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = NotificationStore::new(pool);

        let notifications = Arc::new(Notifications::new(
            store.clone(),
            registry.clone(),
            clock.clone(),
        ));
        let scheduler = Scheduler::new(
            SchedulerConfig {
                max_retries: 3,
                ..SchedulerConfig::default()
            },
            Arc::new(NotificationPendingSource::new(store, resolver.clone())),
            Arc::new(NotificationDispatcher::new(resolver, registry)),
            clock.clone(),
        );

        Harness {
            notifications,
            scheduler,
            clock,
            email,
            sms,
        }
    }

    #[tokio::test]
    async fn scheduled_sms_dispatches_once_due_and_counts_one_retry() {
        let h = harness(MemoryEmailSender::succeeding(), MemorySmsSender::succeeding()).await;
        let runtime = runtime_config("t1", true);

        let raw = RawNotification {
            kind: "sms".to_owned(),
            recipient: "+15557770000".to_owned(),
            message: "m".to_owned(),
            scheduled_for: Some((h.clock.now() + Duration::minutes(2)).fixed_offset()),
            ..RawNotification::default()
        };
        let queued = h.notifications.send(&runtime, raw).await.unwrap();
        assert_eq!(queued.status, NotificationStatus::Queued);

        // Not yet due: nothing is dispatched.
        h.scheduler.run_once().await;
        assert_eq!(h.sms.sent_count(), 0);

        // Three minutes later the row is picked up exactly once.
        h.clock.advance(Duration::minutes(3));
        h.scheduler.run_once().await;
        assert_eq!(h.sms.sent_count(), 1);

        let sent = h
            .notifications
            .get_status(&runtime, queued.id.as_str())
            .await
            .unwrap();
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert_eq!(sent.retry_count, 1);
        assert_eq!(sent.provider_message_id.as_deref(), Some("SM-test"));
        assert_eq!(sent.last_attempted_at, Some(h.clock.now()));

        // A sent row never reappears in later scans.
        h.clock.advance(Duration::hours(1));
        h.scheduler.run_once().await;
        assert_eq!(h.sms.sent_count(), 1);
    }

    #[tokio::test]
    async fn failing_sends_retry_until_the_budget_is_exhausted() {
        let h = harness(MemoryEmailSender::failing(), MemorySmsSender::succeeding()).await;
        let runtime = runtime_config("t1", false);

        let errored = h
            .notifications
            .send(
                &runtime,
                RawNotification {
                    kind: "email".to_owned(),
                    recipient: "a@x.example".to_owned(),
                    message: "m".to_owned(),
                    ..RawNotification::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(errored.status, NotificationStatus::Errored);
        assert_eq!(h.email.sent_count(), 1);

        // Drive the scheduler well past every backoff window; the job may
        // only be retried max_retries (3) times in total.
        for _ in 0..6 {
            h.clock.advance(Duration::hours(1));
            h.scheduler.run_once().await;
        }

        let exhausted = h
            .notifications
            .get_status(&runtime, errored.id.as_str())
            .await
            .unwrap();
        assert_eq!(exhausted.status, NotificationStatus::Errored);
        assert_eq!(exhausted.retry_count, 3);
        assert_eq!(h.email.sent_count(), 1 + 3);
    }

    #[tokio::test]
    async fn retry_accounting_updates_last_attempted_at_each_round() {
        let h = harness(MemoryEmailSender::failing(), MemorySmsSender::succeeding()).await;
        let runtime = runtime_config("t1", false);

        let errored = h
            .notifications
            .send(
                &runtime,
                RawNotification {
                    kind: "email".to_owned(),
                    recipient: "a@x.example".to_owned(),
                    message: "m".to_owned(),
                    ..RawNotification::default()
                },
            )
            .await
            .unwrap();

        h.clock.advance(Duration::hours(1));
        h.scheduler.run_once().await;
        let first = h
            .notifications
            .get_status(&runtime, errored.id.as_str())
            .await
            .unwrap();
        assert_eq!(first.retry_count, 1);
        assert_eq!(first.last_attempted_at, Some(h.clock.now()));

        h.clock.advance(Duration::hours(1));
        h.scheduler.run_once().await;
        let second = h
            .notifications
            .get_status(&runtime, errored.id.as_str())
            .await
            .unwrap();
        assert_eq!(second.retry_count, 2);
        assert_eq!(second.last_attempted_at, Some(h.clock.now()));
    }

    #[tokio::test]
    async fn suspended_tenants_produce_no_jobs() {
        let pool = connect_in_memory().await.unwrap();
        let vault = Arc::new(SecretVault::from_hex(&"44".repeat(32)).unwrap());
        let resolver = Arc::new(RuntimeResolver::new(
            TenantStore::new(pool.clone()),
            vault.clone(),
        ));
        let mut suspended = spec("t1", false);
        suspended.enabled = false;
        let mut bootstrap = Bootstrap::new(pool.clone(), vault);
        bootstrap.register(resolver.clone());
        bootstrap
            .apply(&[suspended, spec("t2", false)])
            .await
            .unwrap();

        let store = NotificationStore::new(pool);
        // A queued row under the suspended tenant.
        let now = Utc::now();
        store
            .insert(&Notification {
                tenant_id: "t1".into(),
                id: "n1".into(),
                kind: NotificationType::Email,
                recipient: "a@x".to_owned(),
                subject: None,
                message: "m".to_owned(),
                status: NotificationStatus::Queued,
                provider_message_id: None,
                retry_count: 0,
                last_attempted_at: None,
                scheduled_for: None,
                created_at: now,
                updated_at: now,
                attachments: Vec::new(),
            })
            .await
            .unwrap();

        let source = NotificationPendingSource::new(store, resolver);
        let jobs = source.pending(5, now).await.unwrap();
        assert!(jobs.is_empty(), "suspended tenants must not fan out");
    }

    #[tokio::test]
    async fn scheduler_marks_sms_disabled_rows_errored() {
        let pool = connect_in_memory().await.unwrap();
        let vault = Arc::new(SecretVault::from_hex(&"55".repeat(32)).unwrap());
        let resolver = Arc::new(RuntimeResolver::new(
            TenantStore::new(pool.clone()),
            vault.clone(),
        ));
        let mut bootstrap = Bootstrap::new(pool.clone(), vault);
        bootstrap.register(resolver.clone());
        // t2 has no SMS profile.
        bootstrap.apply(&[spec("t2", false)]).await.unwrap();

        let store = NotificationStore::new(pool);
        let now = Utc::now();
        store
            .insert(&Notification {
                tenant_id: "t2".into(),
                id: "sms-1".into(),
                kind: NotificationType::Sms,
                recipient: "+15550001111".to_owned(),
                subject: None,
                message: "m".to_owned(),
                status: NotificationStatus::Queued,
                provider_message_id: None,
                retry_count: 0,
                last_attempted_at: None,
                scheduled_for: None,
                created_at: now,
                updated_at: now,
                attachments: Vec::new(),
            })
            .await
            .unwrap();

        let registry = Arc::new(SenderRegistry::new());
        let clock = Arc::new(ManualClock::new(now));
        let scheduler = Scheduler::new(
            SchedulerConfig::default(),
            Arc::new(NotificationPendingSource::new(store.clone(), resolver.clone())),
            Arc::new(NotificationDispatcher::new(resolver, registry)),
            clock,
        );
        scheduler.run_once().await;

        let row = store.get(&"t2".into(), &"sms-1".into()).await.unwrap();
        assert_eq!(row.status, NotificationStatus::Errored);
        assert_eq!(row.retry_count, 1);
    }
}
