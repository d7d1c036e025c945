//! The two delivery capabilities Herald routes notifications through:
//! "deliver an email" and "deliver an SMS".
//!
//! Implementations are interchangeable; production code registers the SMTP
//! and SMS-provider senders, while tests inject in-memory doubles. Both
//! traits are object-safe so the sender registry can cache them behind
//! `Arc<dyn ...>`.

use async_trait::async_trait;
use thiserror::Error;

use herald_core::Attachment;

/// An email ready for transport.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address.
    pub to: String,
    /// Subject line (may be empty).
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Attached files.
    pub attachments: Vec<Attachment>,
}

/// An SMS ready for transport.
#[derive(Debug, Clone)]
pub struct SmsMessage {
    /// Recipient phone number (E.164).
    pub to: String,
    /// Message body.
    pub body: String,
}

/// Acknowledgement from a provider after a successful send.
///
/// Provider acknowledgement is treated as delivery success; Herald does not
/// track anything past this point.
#[derive(Debug, Clone, Default)]
pub struct SendReceipt {
    /// Identifier the provider assigned to the message, when it reports one.
    pub provider_message_id: Option<String>,
}

/// Errors a sender can produce.
#[derive(Debug, Error)]
pub enum SendError {
    /// The sender cannot be constructed or used with its configuration.
    #[error("sender configuration error: {0}")]
    Configuration(String),

    /// A transport-level failure; worth retrying.
    #[error("connection error: {0}")]
    Connection(String),

    /// The provider rejected the message.
    #[error("provider rejected the message: {0}")]
    Provider(String),

    /// The recipient address could not be parsed.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The provider throttled us; worth retrying later.
    #[error("rate limited by provider")]
    RateLimited,
}

impl SendError {
    /// Whether a later attempt could plausibly succeed without a
    /// configuration change.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::RateLimited)
    }
}

/// Capability: deliver one email message.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<SendReceipt, SendError>;
}

/// Capability: deliver one SMS message.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, message: &SmsMessage) -> Result<SendReceipt, SendError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct StaticEmailSender {
        fail: bool,
    }

    #[async_trait]
    impl EmailSender for StaticEmailSender {
        async fn send_email(&self, _message: &EmailMessage) -> Result<SendReceipt, SendError> {
            if self.fail {
                return Err(SendError::Connection("socket closed".to_owned()));
            }
            Ok(SendReceipt { provider_message_id: Some("msg-1".to_owned()) })
        }
    }

    #[tokio::test]
    async fn traits_are_object_safe() {
        let sender: Arc<dyn EmailSender> = Arc::new(StaticEmailSender { fail: false });
        let receipt = sender
            .send_email(&EmailMessage {
                to: "a@x".to_owned(),
                subject: String::new(),
                body: "hi".to_owned(),
                attachments: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(receipt.provider_message_id.as_deref(), Some("msg-1"));
    }

    #[test]
    fn retryability_classification() {
        assert!(SendError::Connection("x".into()).is_retryable());
        assert!(SendError::RateLimited.is_retryable());
        assert!(!SendError::Provider("x".into()).is_retryable());
        assert!(!SendError::Configuration("x".into()).is_retryable());
        assert!(!SendError::InvalidRecipient("x".into()).is_retryable());
    }
}
