use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use secrecy::ExposeSecret;

use herald_core::{HeraldError, RuntimeConfig};
use herald_email::SmtpEmailSender;
use herald_sender::{EmailSender, SmsSender};
use herald_sms::{HttpSmsSender, SmsConfig};

/// Vends an email or SMS sender instance for a tenant's runtime config.
///
/// Senders are constructed lazily on first use and cached per tenant behind
/// a reader/writer lock with double-checked insertion, so concurrent callers
/// never build duplicate transports. A process-wide default sender can be
/// installed as a test override; it bypasses credential checks entirely.
#[derive(Default)]
pub struct SenderRegistry {
    email_cache: RwLock<HashMap<String, Arc<dyn EmailSender>>>,
    sms_cache: RwLock<HashMap<String, Arc<dyn SmsSender>>>,
    default_email: Option<Arc<dyn EmailSender>>,
    default_sms: Option<Arc<dyn SmsSender>>,
}

impl SenderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a process-wide email sender override.
    #[must_use]
    pub fn with_default_email_sender(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.default_email = Some(sender);
        self
    }

    /// Install a process-wide SMS sender override.
    #[must_use]
    pub fn with_default_sms_sender(mut self, sender: Arc<dyn SmsSender>) -> Self {
        self.default_sms = Some(sender);
        self
    }

    /// The email sender for this tenant, constructing and caching it on
    /// first use.
    pub fn email_sender_for(
        &self,
        runtime: &RuntimeConfig,
    ) -> Result<Arc<dyn EmailSender>, HeraldError> {
        if let Some(sender) = &self.default_email {
            return Ok(sender.clone());
        }

        let tenant = runtime.tenant.id.as_str();
        if let Some(sender) = self
            .email_cache
            .read()
            .expect("email cache lock poisoned")
            .get(tenant)
        {
            return Ok(sender.clone());
        }

        let creds = &runtime.email;
        if creds.host.is_empty()
            || creds.username.expose_secret().is_empty()
            || creds.password.expose_secret().is_empty()
            || creds.from_address.is_empty()
        {
            return Err(HeraldError::internal(format!(
                "email sender unavailable for tenant {tenant:?}: incomplete SMTP credentials"
            )));
        }

        let mut cache = self.email_cache.write().expect("email cache lock poisoned");
        // Double-checked: another caller may have built the sender while we
        // waited for the write lock.
        if let Some(sender) = cache.get(tenant) {
            return Ok(sender.clone());
        }
        let sender: Arc<dyn EmailSender> = Arc::new(
            SmtpEmailSender::new(creds)
                .map_err(|e| HeraldError::internal(format!("email sender construction: {e}")))?,
        );
        cache.insert(tenant.to_owned(), sender.clone());
        Ok(sender)
    }

    /// The SMS sender for this tenant, or `sms_disabled` when the runtime
    /// carries no SMS credentials.
    pub fn sms_sender_for(
        &self,
        runtime: &RuntimeConfig,
    ) -> Result<Arc<dyn SmsSender>, HeraldError> {
        if let Some(sender) = &self.default_sms {
            return Ok(sender.clone());
        }

        let Some(creds) = &runtime.sms else {
            return Err(HeraldError::SmsDisabled);
        };

        let tenant = runtime.tenant.id.as_str();
        if let Some(sender) = self
            .sms_cache
            .read()
            .expect("sms cache lock poisoned")
            .get(tenant)
        {
            return Ok(sender.clone());
        }

        let mut cache = self.sms_cache.write().expect("sms cache lock poisoned");
        if let Some(sender) = cache.get(tenant) {
            return Ok(sender.clone());
        }
        let sender: Arc<dyn SmsSender> = Arc::new(
            HttpSmsSender::new(SmsConfig::from_credentials(creds))
                .map_err(|e| HeraldError::internal(format!("sms sender construction: {e}")))?,
        );
        cache.insert(tenant.to_owned(), sender.clone());
        Ok(sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryEmailSender, MemorySmsSender, runtime_config};

    #[test]
    fn default_override_bypasses_credentials() {
        let sender = Arc::new(MemoryEmailSender::succeeding());
        let registry = SenderRegistry::new().with_default_email_sender(sender);

        let mut runtime = runtime_config("t1", false);
        runtime.email.host.clear();
        assert!(registry.email_sender_for(&runtime).is_ok());
    }

    #[test]
    fn missing_email_credentials_are_rejected() {
        let registry = SenderRegistry::new();
        let mut runtime = runtime_config("t1", false);
        runtime.email.host.clear();

        let err = match registry.email_sender_for(&runtime) {
            Ok(_) => panic!("expected email_sender_for to fail"),
            Err(err) => err,
        };
        assert_eq!(err.code(), "internal");
    }

    #[tokio::test]
    async fn email_sender_is_cached_per_tenant() {
        let registry = SenderRegistry::new();
        let runtime = runtime_config("t1", false);

        let first = registry.email_sender_for(&runtime).unwrap();
        let second = registry.email_sender_for(&runtime).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn sms_without_credentials_is_disabled() {
        let registry = SenderRegistry::new();
        let runtime = runtime_config("t1", false);

        let err = match registry.sms_sender_for(&runtime) {
            Ok(_) => panic!("expected sms_sender_for to fail"),
            Err(err) => err,
        };
        assert_eq!(err.code(), "sms_disabled");
    }

    #[test]
    fn sms_with_credentials_resolves_and_caches() {
        let registry = SenderRegistry::new();
        let runtime = runtime_config("t1", true);

        let first = registry.sms_sender_for(&runtime).unwrap();
        let second = registry.sms_sender_for(&runtime).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn sms_default_override_wins_even_when_disabled() {
        let registry =
            SenderRegistry::new().with_default_sms_sender(Arc::new(MemorySmsSender::succeeding()));
        let runtime = runtime_config("t1", false);
        assert!(registry.sms_sender_for(&runtime).is_ok());
    }
}
