use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::types::{NotificationId, TenantId};

/// Delivery channel of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Sms,
}

impl NotificationType {
    /// Parse a channel label, case-insensitively. Returns `None` for anything
    /// other than `email` or `sms`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a notification.
///
/// Writes only ever produce this canonical set. The legacy label `failed`
/// is still accepted on read and canonicalized to [`Errored`](Self::Errored);
/// that normalization is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Queued,
    Sent,
    Errored,
    Cancelled,
}

impl NotificationStatus {
    /// Parse a status label, canonicalizing the legacy `failed` to `errored`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "sent" => Some(Self::Sent),
            "errored" | "failed" => Some(Self::Errored),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        }
    }

    /// `sent` and `cancelled` are terminal; nothing mutates them afterwards.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Allowed transitions: queued→sent, queued→errored, queued→cancelled,
    /// errored→sent, errored→errored.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Sent | Self::Errored | Self::Cancelled)
                | (Self::Errored, Self::Sent | Self::Errored)
        )
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted notification and its audit fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Tenant that owns this notification.
    pub tenant_id: TenantId,

    /// Business id, unique within the tenant.
    pub id: NotificationId,

    /// Delivery channel.
    pub kind: NotificationType,

    /// Recipient address (email address or E.164 phone number).
    pub recipient: String,

    /// Optional subject line (email only).
    pub subject: Option<String>,

    /// Message body.
    pub message: String,

    /// Current lifecycle state.
    pub status: NotificationStatus,

    /// Identifier assigned by the delivery provider, when one was reported.
    pub provider_message_id: Option<String>,

    /// Number of *retries* performed. The initial send attempt does not
    /// count; only scheduler-driven attempts increment this.
    pub retry_count: u32,

    /// Instant of the most recent delivery attempt.
    pub last_attempted_at: Option<DateTime<Utc>>,

    /// Earliest instant the notification may be dispatched (UTC). `None`
    /// means "as soon as possible".
    pub scheduled_for: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Attached files; non-empty only for email notifications.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}
