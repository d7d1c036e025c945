use serde::{Deserialize, Serialize};

/// Form body of a Messages API send request.
#[derive(Debug, Serialize)]
pub struct SendMessageForm<'a> {
    #[serde(rename = "To")]
    pub to: &'a str,
    #[serde(rename = "From")]
    pub from: &'a str,
    #[serde(rename = "Body")]
    pub body: &'a str,
}

/// Relevant subset of the Messages API response.
#[derive(Debug, Deserialize)]
pub struct SmsApiResponse {
    /// Provider-assigned message identifier.
    pub sid: Option<String>,
    /// Provider-side delivery status label.
    pub status: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}
