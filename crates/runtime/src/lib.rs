//! Tenant runtime resolution.
//!
//! Translates a request host or tenant id into a [`RuntimeConfig`]: the
//! tenant record plus its decrypted delivery credentials. Both lookup paths
//! are cached; the bootstrap procedure flushes the caches through
//! [`RuntimeInvalidate`] after every successful reload, so a credential
//! rotation becomes visible on the next resolve.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::debug;

use herald_core::{EmailCredentials, RuntimeConfig, RuntimeInvalidate, SmsCredentials, Tenant};
use herald_crypto::{CryptoError, SecretVault};
use herald_store::{StoreError, TenantStore, normalize_domain};

/// Errors produced while resolving a tenant runtime.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The host to resolve was blank after normalization.
    #[error("empty host")]
    EmptyHost,

    /// The tenant id to resolve was blank.
    #[error("invalid tenant id")]
    InvalidTenantId,

    /// No tenant matches the given host or id.
    #[error("not found")]
    NotFound,

    /// Stored credential ciphertext failed to decrypt; surfaced as-is.
    #[error(transparent)]
    Decrypt(#[from] CryptoError),

    /// Any unexpected storage failure.
    #[error("tenant runtime: {0}")]
    Storage(String),
}

impl From<StoreError> for ResolveError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Resolves hosts and tenant ids to runtime configs, with caching.
///
/// Cache reads hand out clones of the stored [`RuntimeConfig`]; every field
/// is owned, so callers can never mutate cache state through the copy.
pub struct RuntimeResolver {
    tenants: TenantStore,
    vault: Arc<SecretVault>,
    host_cache: RwLock<HashMap<String, String>>,
    config_cache: RwLock<HashMap<String, RuntimeConfig>>,
}

impl RuntimeResolver {
    #[must_use]
    pub fn new(tenants: TenantStore, vault: Arc<SecretVault>) -> Self {
        Self {
            tenants,
            vault,
            host_cache: RwLock::new(HashMap::new()),
            config_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a request host (e.g. `Foo.Example:8080`) to a runtime config.
    pub async fn resolve_by_host(&self, host: &str) -> Result<RuntimeConfig, ResolveError> {
        let normalized = normalize_domain(host);
        if normalized.is_empty() {
            return Err(ResolveError::EmptyHost);
        }

        let cached = self
            .host_cache
            .read()
            .expect("host cache lock poisoned")
            .get(&normalized)
            .cloned();
        if let Some(tenant_id) = cached {
            return self.resolve_by_id(&tenant_id).await;
        }

        let tenant_id = self.tenants.domain_tenant_id(&normalized).await?;
        let runtime = self.resolve_by_id(&tenant_id).await?;

        self.host_cache
            .write()
            .expect("host cache lock poisoned")
            .insert(normalized, tenant_id);
        Ok(runtime)
    }

    /// Resolve a tenant id to a runtime config.
    pub async fn resolve_by_id(&self, tenant_id: &str) -> Result<RuntimeConfig, ResolveError> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(ResolveError::InvalidTenantId);
        }

        let cached = self
            .config_cache
            .read()
            .expect("config cache lock poisoned")
            .get(tenant_id)
            .cloned();
        if let Some(runtime) = cached {
            return Ok(runtime);
        }

        let runtime = self.load(tenant_id).await?;
        self.config_cache
            .write()
            .expect("config cache lock poisoned")
            .insert(tenant_id.to_owned(), runtime.clone());

        debug!(tenant = tenant_id, "tenant runtime resolved and cached");
        Ok(runtime)
    }

    /// All tenants whose status is active.
    pub async fn list_active_tenants(&self) -> Result<Vec<Tenant>, ResolveError> {
        Ok(self.tenants.list_active_tenants().await?)
    }

    async fn load(&self, tenant_id: &str) -> Result<RuntimeConfig, ResolveError> {
        let tenant = self.tenants.get_tenant(tenant_id).await?;

        let email_row = match self.tenants.email_profile(tenant_id).await {
            Ok(row) => row,
            Err(StoreError::NotFound) => {
                // Every tenant must carry a default email profile; a missing
                // one is a configuration defect, not a missing tenant.
                return Err(ResolveError::Storage(format!(
                    "tenant {tenant_id:?} has no email profile"
                )));
            }
            Err(other) => return Err(other.into()),
        };

        let port = u16::try_from(email_row.port)
            .map_err(|_| ResolveError::Storage(format!("invalid SMTP port {}", email_row.port)))?;

        let email = EmailCredentials {
            host: email_row.host,
            port,
            username: self.vault.decrypt(&email_row.username_ct)?,
            password: self.vault.decrypt(&email_row.password_ct)?,
            from_address: email_row.from_address,
        };

        let sms = match self.tenants.sms_profile(tenant_id).await? {
            Some(row) => Some(SmsCredentials {
                account_sid: self.vault.decrypt(&row.account_sid_ct)?,
                auth_token: self.vault.decrypt(&row.auth_token_ct)?,
                from_number: row.from_number,
            }),
            None => None,
        };

        Ok(RuntimeConfig { tenant, email, sms })
    }
}

impl RuntimeInvalidate for RuntimeResolver {
    fn invalidate(&self) {
        self.host_cache
            .write()
            .expect("host cache lock poisoned")
            .clear();
        self.config_cache
            .write()
            .expect("config cache lock poisoned")
            .clear();
        debug!("tenant runtime caches invalidated");
    }
}
