//! SMS delivery backend speaking the provider's Messages REST API.

mod config;
mod types;

pub use config::{DEFAULT_API_BASE_URL, SmsConfig};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use herald_core::log_digest;
use herald_sender::{SendError, SendReceipt, SmsMessage, SmsSender};

use crate::types::{SendMessageForm, SmsApiResponse};

/// SMS sender posting to the provider REST API, one instance per tenant.
pub struct HttpSmsSender {
    config: SmsConfig,
    client: Client,
}

impl std::fmt::Debug for HttpSmsSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSmsSender")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpSmsSender {
    /// Create a sender with a default HTTP client and a 30 second timeout.
    pub fn new(config: SmsConfig) -> Result<Self, SendError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SendError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Create a sender with a custom HTTP client.
    ///
    /// Useful for testing or for sharing a connection pool across senders.
    #[must_use]
    pub fn with_client(config: SmsConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send_sms(&self, message: &SmsMessage) -> Result<SendReceipt, SendError> {
        let url = self.config.messages_url();
        debug!(to = %log_digest(&message.to), "sending SMS");

        let form = SendMessageForm {
            to: &message.to,
            from: &self.config.from_number,
            body: &message.body,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(
                self.config.account_sid.expose_secret(),
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| SendError::Connection(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("SMS provider rate limit hit");
            return Err(SendError::RateLimited);
        }

        if !status.is_success() {
            return Err(SendError::Provider(format!("HTTP {status}")));
        }

        let api_response: SmsApiResponse = response
            .json()
            .await
            .map_err(|e| SendError::Provider(format!("unreadable provider response: {e}")))?;

        if let Some(code) = api_response.error_code {
            let detail = api_response
                .error_message
                .unwrap_or_else(|| format!("error code {code}"));
            return Err(SendError::Provider(detail));
        }

        debug!(
            to = %log_digest(&message.to),
            provider_status = api_response.status.as_deref().unwrap_or("unknown"),
            "SMS accepted by provider"
        );

        Ok(SendReceipt { provider_message_id: api_response.sid })
    }
}
