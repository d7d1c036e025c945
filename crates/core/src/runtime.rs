use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::types::TenantId;

/// Lifecycle status of a tenant. Set exclusively by the bootstrap procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl TenantStatus {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

/// A tenant record: an isolated namespace all notifications are scoped to.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: TenantId,
    pub display_name: String,
    pub support_email: Option<String>,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decrypted SMTP credentials for a tenant's email delivery.
#[derive(Clone)]
pub struct EmailCredentials {
    pub host: String,
    pub port: u16,
    pub username: SecretString,
    pub password: SecretString,
    pub from_address: String,
}

impl fmt::Debug for EmailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Decrypted SMS provider credentials for a tenant. Absence of this record
/// means SMS delivery is disabled for the tenant.
#[derive(Clone)]
pub struct SmsCredentials {
    pub account_sid: SecretString,
    pub auth_token: SecretString,
    pub from_number: String,
}

impl fmt::Debug for SmsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsCredentials")
            .field("account_sid", &"[REDACTED]")
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// The decrypted bundle of a tenant's live delivery credentials and metadata.
///
/// Resolver caches hand out clones; since every field is owned, a clone is a
/// deep copy and callers can never mutate shared cache state.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub tenant: Tenant,
    pub email: EmailCredentials,
    pub sms: Option<SmsCredentials>,
}

/// Flush hook the bootstrap invokes on every registered resolver after a
/// successful reload, so stale runtime configs never outlive a credential
/// rotation.
pub trait RuntimeInvalidate: Send + Sync {
    fn invalidate(&self);
}
