//! In-memory sender doubles and fixtures shared by tests across crates.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;

use herald_core::{
    EmailCredentials, RuntimeConfig, SmsCredentials, Tenant, TenantStatus,
};
use herald_sender::{
    EmailMessage, EmailSender, SendError, SendReceipt, SmsMessage, SmsSender,
};

/// An [`EmailSender`] that records every message and answers from a script.
pub struct MemoryEmailSender {
    pub sent: Mutex<Vec<EmailMessage>>,
    outcome: Outcome,
}

/// An [`SmsSender`] that records every message and answers from a script.
pub struct MemorySmsSender {
    pub sent: Mutex<Vec<SmsMessage>>,
    outcome: Outcome,
}

enum Outcome {
    Succeed { provider_message_id: Option<String> },
    FailConnection,
}

impl MemoryEmailSender {
    #[must_use]
    pub fn succeeding() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcome: Outcome::Succeed { provider_message_id: None },
        }
    }

    #[must_use]
    pub fn succeeding_with_id(id: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcome: Outcome::Succeed { provider_message_id: Some(id.into()) },
        }
    }

    /// Every send fails with a retryable connection error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcome: Outcome::FailConnection,
        }
    }

    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("sender lock poisoned").len()
    }
}

impl MemorySmsSender {
    #[must_use]
    pub fn succeeding() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcome: Outcome::Succeed { provider_message_id: Some("SM-test".to_owned()) },
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcome: Outcome::FailConnection,
        }
    }

    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("sender lock poisoned").len()
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<SendReceipt, SendError> {
        self.sent
            .lock()
            .expect("sender lock poisoned")
            .push(message.clone());
        match &self.outcome {
            Outcome::Succeed { provider_message_id } => Ok(SendReceipt {
                provider_message_id: provider_message_id.clone(),
            }),
            Outcome::FailConnection => Err(SendError::Connection("smtp unreachable".to_owned())),
        }
    }
}

#[async_trait]
impl SmsSender for MemorySmsSender {
    async fn send_sms(&self, message: &SmsMessage) -> Result<SendReceipt, SendError> {
        self.sent
            .lock()
            .expect("sender lock poisoned")
            .push(message.clone());
        match &self.outcome {
            Outcome::Succeed { provider_message_id } => Ok(SendReceipt {
                provider_message_id: provider_message_id.clone(),
            }),
            Outcome::FailConnection => Err(SendError::Connection("provider unreachable".to_owned())),
        }
    }
}

/// A plausible runtime config for tests, with or without SMS credentials.
#[must_use]
pub fn runtime_config(tenant_id: &str, with_sms: bool) -> RuntimeConfig {
    let now = Utc::now();
    RuntimeConfig {
        tenant: Tenant {
            id: tenant_id.into(),
            display_name: format!("Tenant {tenant_id}"),
            support_email: None,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        },
        email: EmailCredentials {
            host: "smtp.example.com".to_owned(),
            port: 587,
            username: SecretString::new("mailer".to_owned()),
            password: SecretString::new("secret".to_owned()),
            from_address: format!("no-reply@{tenant_id}.example"),
        },
        sms: with_sms.then(|| SmsCredentials {
            account_sid: SecretString::new("AC-test".to_owned()),
            auth_token: SecretString::new("token".to_owned()),
            from_number: "+15550009999".to_owned(),
        }),
    }
}
