//! SMTP email delivery backend using `lettre`.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as FilePart, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::{debug, error};

use herald_core::{EmailCredentials, log_digest};
use herald_sender::{EmailMessage, EmailSender, SendError, SendReceipt};

/// Email sender speaking SMTP with STARTTLS, one instance per tenant.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl std::fmt::Debug for SmtpEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailSender")
            .field("from_address", &self.from_address)
            .field("transport", &"<AsyncSmtpTransport>")
            .finish()
    }
}

impl SmtpEmailSender {
    /// Build a sender from a tenant's decrypted SMTP credentials.
    pub fn new(credentials: &EmailCredentials) -> Result<Self, SendError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&credentials.host)
            .map_err(|e| SendError::Configuration(format!("SMTP relay error: {e}")))?
            .port(credentials.port)
            .credentials(Credentials::new(
                credentials.username.expose_secret().clone(),
                credentials.password.expose_secret().clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from_address: credentials.from_address.clone(),
        })
    }

    /// Build a sender around a pre-built transport (for testing).
    #[must_use]
    pub fn with_transport(
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<SendReceipt, SendError> {
        debug!(to = %log_digest(&message.to), "building SMTP message");
        let email = build_message(&self.from_address, message)?;

        self.transport.send(email).await.map_err(|e| {
            error!(to = %log_digest(&message.to), error = %e, "SMTP send failed");
            map_smtp_error(&e)
        })?;

        // SMTP acknowledges delivery but assigns no message id we can report.
        Ok(SendReceipt { provider_message_id: None })
    }
}

/// Build a `lettre::Message` from the transport-agnostic [`EmailMessage`].
fn build_message(from: &str, msg: &EmailMessage) -> Result<Message, SendError> {
    let from_mailbox: Mailbox = from
        .parse()
        .map_err(|e| SendError::Configuration(format!("invalid from address: {e}")))?;

    let to_mailbox: Mailbox = msg
        .to
        .parse::<Mailbox>()
        .map_err(|e| SendError::InvalidRecipient(e.to_string()))?;

    let builder = Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(&msg.subject);

    let email = if msg.attachments.is_empty() {
        builder
            .body(msg.body.clone())
            .map_err(|e| SendError::Provider(format!("failed to build email: {e}")))?
    } else {
        let mut multipart = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(msg.body.clone()),
        );
        for attachment in &msg.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                SendError::Provider(format!(
                    "invalid attachment content type {:?}: {e}",
                    attachment.content_type
                ))
            })?;
            multipart = multipart.singlepart(
                FilePart::new(attachment.filename.clone())
                    .body(Body::new(attachment.data.clone()), content_type),
            );
        }
        builder
            .multipart(multipart)
            .map_err(|e| SendError::Provider(format!("failed to build email: {e}")))?
    };

    Ok(email)
}

/// Map a lettre SMTP error to the appropriate [`SendError`] variant.
fn map_smtp_error(error: &lettre::transport::smtp::Error) -> SendError {
    let message = error.to_string();

    if error.is_permanent() {
        SendError::Provider(format!("permanent SMTP error: {message}"))
    } else {
        // Transient responses, timeouts, and connection problems all look
        // retryable from here.
        SendError::Connection(format!("SMTP error: {message}"))
    }
}
