use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Rejection from the external session service.
#[derive(Debug, Error)]
#[error("session rejected: {0}")]
pub struct SessionError(pub String);

/// Validates `app_session` cookie values against the external auth service.
///
/// The validator is an external collaborator; Herald only cares whether the
/// presented session is currently acceptable. Cookie values are never logged.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn validate(&self, session: &str) -> Result<(), SessionError>;
}

/// Production validator posting the session token to the auth service.
pub struct HttpSessionValidator {
    client: reqwest::Client,
    validate_url: String,
}

impl HttpSessionValidator {
    #[must_use]
    pub fn new(validate_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            validate_url: validate_url.into(),
        }
    }
}

#[async_trait]
impl SessionValidator for HttpSessionValidator {
    async fn validate(&self, session: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(&self.validate_url)
            .json(&serde_json::json!({ "token": session }))
            .send()
            .await
            .map_err(|e| SessionError(format!("validator unreachable: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            debug!(status = %response.status(), "session validation rejected");
            Err(SessionError(format!("validator returned {}", response.status())))
        }
    }
}

/// Extract the `app_session` cookie value from a `Cookie` header.
#[must_use]
pub fn session_cookie(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "app_session")
        .map(|(_, value)| value.to_owned())
}
