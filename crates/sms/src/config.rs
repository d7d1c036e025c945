use secrecy::{ExposeSecret, SecretString};

use herald_core::SmsCredentials;

/// Configuration for the SMS provider client.
#[derive(Clone)]
pub struct SmsConfig {
    /// Provider account identifier used to authenticate API requests.
    pub account_sid: SecretString,

    /// Provider auth token used for HTTP Basic authentication.
    pub auth_token: SecretString,

    /// "From" phone number (E.164 format).
    pub from_number: String,

    /// Base URL for the provider REST API. Override this for testing against
    /// a mock server.
    pub api_base_url: String,
}

/// Default provider API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &"[REDACTED]")
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl SmsConfig {
    /// Build a configuration from a tenant's decrypted SMS credentials.
    #[must_use]
    pub fn from_credentials(credentials: &SmsCredentials) -> Self {
        Self {
            account_sid: credentials.account_sid.clone(),
            auth_token: credentials.auth_token.clone(),
            from_number: credentials.from_number.clone(),
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
        }
    }

    /// Override the API base URL (useful for testing).
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Messages API URL for this account.
    pub(crate) fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url,
            self.account_sid.expose_secret()
        )
    }
}
