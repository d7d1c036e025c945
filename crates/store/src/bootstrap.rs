use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use herald_core::RuntimeInvalidate;
use herald_crypto::{CryptoError, SecretVault};

use crate::error::StoreError;

/// Declarative description of one tenant, as read from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub support_email: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub domains: Vec<String>,
    pub email_profile: EmailProfileSpec,
    #[serde(default)]
    pub sms_profile: Option<SmsProfileSpec>,
    /// Legacy field; its presence fails the load. Only `enabled` is accepted.
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

/// SMTP credentials for a tenant, plaintext at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailProfileSpec {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// SMS provider credentials for a tenant, plaintext at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsProfileSpec {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Errors rejecting a tenant configuration load.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("tenant list is empty")]
    EmptyTenantList,

    #[error("no tenant is enabled")]
    NoTenantEnabled,

    #[error("duplicate domain {0:?}")]
    DuplicateDomain(String),

    #[error("tenant {0:?} is enabled but declares no domain")]
    MissingDomain(String),

    #[error("tenant {0:?} uses the legacy `status` field; declare `enabled` instead")]
    LegacyStatusField(String),

    #[error("domain conflict: {0:?} is bound to another tenant")]
    DomainConflict(String),

    #[error("invalid tenants file: {0}")]
    Parse(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for BootstrapError {
    fn from(value: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(value))
    }
}

/// Normalize a domain for lookup: trim, lowercase, strip a `:port` suffix.
#[must_use]
pub fn normalize_domain(raw: &str) -> String {
    let host = raw.trim().to_lowercase();
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name.to_owned()
        }
        _ => host,
    }
}

/// Parse a YAML document containing a list of tenant specifications.
pub fn specs_from_yaml(text: &str) -> Result<Vec<TenantSpec>, BootstrapError> {
    serde_yaml_ng::from_str(text).map_err(|e| BootstrapError::Parse(e.to_string()))
}

/// Applies the declarative tenant configuration idempotently at startup.
///
/// The whole apply runs in one transaction, so a failed load leaves the
/// previous state untouched. On success every registered resolver cache is
/// flushed.
pub struct Bootstrap {
    pool: SqlitePool,
    vault: Arc<SecretVault>,
    resolvers: Vec<Arc<dyn RuntimeInvalidate>>,
}

impl Bootstrap {
    #[must_use]
    pub fn new(pool: SqlitePool, vault: Arc<SecretVault>) -> Self {
        Self {
            pool,
            vault,
            resolvers: Vec::new(),
        }
    }

    /// Register a resolver whose caches must be flushed after a successful
    /// apply.
    pub fn register(&mut self, resolver: Arc<dyn RuntimeInvalidate>) {
        self.resolvers.push(resolver);
    }

    /// Validate and apply the given tenant specifications.
    pub async fn apply(&self, specs: &[TenantSpec]) -> Result<(), BootstrapError> {
        validate(specs)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for spec in specs {
            upsert_tenant(&mut tx, spec, now).await?;
        }

        // Truncate the global domain table before reinsertion so domains can
        // move between tenants within the same load.
        sqlx::query("DELETE FROM tenant_domains").execute(&mut *tx).await?;

        for spec in specs {
            for (index, domain) in spec.domains.iter().enumerate() {
                let hostname = normalize_domain(domain);
                sqlx::query(
                    "INSERT INTO tenant_domains (hostname, tenant_id, is_default) VALUES (?, ?, ?)",
                )
                .bind(&hostname)
                .bind(&spec.id)
                .bind(index == 0)
                .execute(&mut *tx)
                .await?;
            }
        }

        // A host may resolve to at most one tenant; verify what actually
        // landed in the table.
        for spec in specs {
            for domain in &spec.domains {
                let hostname = normalize_domain(domain);
                let owner: Option<(String,)> =
                    sqlx::query_as("SELECT tenant_id FROM tenant_domains WHERE hostname = ?")
                        .bind(&hostname)
                        .fetch_optional(&mut *tx)
                        .await?;
                if owner.map(|(id,)| id) != Some(spec.id.clone()) {
                    return Err(BootstrapError::DomainConflict(hostname));
                }
            }
        }

        for spec in specs {
            self.replace_email_profile(&mut tx, spec, now).await?;
            match &spec.sms_profile {
                Some(profile) => self.replace_sms_profile(&mut tx, &spec.id, profile, now).await?,
                None => {
                    sqlx::query("DELETE FROM sms_profiles WHERE tenant_id = ?")
                        .bind(&spec.id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;

        for resolver in &self.resolvers {
            resolver.invalidate();
        }

        info!(tenants = specs.len(), "tenant bootstrap applied");
        Ok(())
    }

    async fn replace_email_profile(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        spec: &TenantSpec,
        now: DateTime<Utc>,
    ) -> Result<(), BootstrapError> {
        let username_ct = self.vault.encrypt(&spec.email_profile.username)?;
        let password_ct = self.vault.encrypt(&spec.email_profile.password)?;

        sqlx::query("DELETE FROM email_profiles WHERE tenant_id = ?")
            .bind(&spec.id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            "INSERT INTO email_profiles \
             (tenant_id, host, port, username_ct, password_ct, from_address, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&spec.id)
        .bind(&spec.email_profile.host)
        .bind(i64::from(spec.email_profile.port))
        .bind(username_ct)
        .bind(password_ct)
        .bind(&spec.email_profile.from)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn replace_sms_profile(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        tenant_id: &str,
        profile: &SmsProfileSpec,
        now: DateTime<Utc>,
    ) -> Result<(), BootstrapError> {
        let account_sid_ct = self.vault.encrypt(&profile.account_sid)?;
        let auth_token_ct = self.vault.encrypt(&profile.auth_token)?;

        sqlx::query("DELETE FROM sms_profiles WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            "INSERT INTO sms_profiles \
             (tenant_id, account_sid_ct, auth_token_ct, from_number, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(tenant_id)
        .bind(account_sid_ct)
        .bind(auth_token_ct)
        .bind(&profile.from_number)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

async fn upsert_tenant(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    spec: &TenantSpec,
    now: DateTime<Utc>,
) -> Result<(), BootstrapError> {
    let status = if spec.enabled { "active" } else { "suspended" };
    sqlx::query(
        "INSERT INTO tenants (id, display_name, support_email, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (id) DO UPDATE SET \
           display_name = excluded.display_name, \
           support_email = excluded.support_email, \
           status = excluded.status, \
           updated_at = excluded.updated_at",
    )
    .bind(&spec.id)
    .bind(&spec.display_name)
    .bind(&spec.support_email)
    .bind(status)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn validate(specs: &[TenantSpec]) -> Result<(), BootstrapError> {
    if specs.is_empty() {
        return Err(BootstrapError::EmptyTenantList);
    }

    let mut seen_domains = HashSet::new();
    for spec in specs {
        if spec.status.is_some() {
            return Err(BootstrapError::LegacyStatusField(spec.id.clone()));
        }
        if spec.enabled && spec.domains.is_empty() {
            return Err(BootstrapError::MissingDomain(spec.id.clone()));
        }
        for domain in &spec.domains {
            let normalized = normalize_domain(domain);
            if !seen_domains.insert(normalized.clone()) {
                return Err(BootstrapError::DuplicateDomain(normalized));
            }
        }
    }

    if !specs.iter().any(|s| s.enabled) {
        return Err(BootstrapError::NoTenantEnabled);
    }

    Ok(())
}
