use sqlx::SqlitePool;

use herald_core::Tenant;

use crate::error::{StoreError, StoreResult};
use crate::model::{EmailProfileRow, SmsProfileRow, TenantRow};

/// Read access to tenants, their domains, and credential profiles.
///
/// Rows in these tables are written exclusively by the bootstrap procedure;
/// at runtime this store only resolves lookups for the tenant resolver.
#[derive(Debug, Clone)]
pub struct TenantStore {
    pool: SqlitePool,
}

impl TenantStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a tenant row by id.
    pub async fn get_tenant(&self, id: &str) -> StoreResult<Tenant> {
        let row: Option<TenantRow> = sqlx::query_as(
            "SELECT id, display_name, support_email, status, created_at, updated_at \
             FROM tenants WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.into_tenant()
    }

    /// Resolve a normalized hostname to its owning tenant id.
    pub async fn domain_tenant_id(&self, hostname: &str) -> StoreResult<String> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT tenant_id FROM tenant_domains WHERE hostname = ?")
                .bind(hostname)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(id,)| id).ok_or(StoreError::NotFound)
    }

    /// All tenants whose status is `active`.
    pub async fn list_active_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let rows: Vec<TenantRow> = sqlx::query_as(
            "SELECT id, display_name, support_email, status, created_at, updated_at \
             FROM tenants WHERE status = 'active' ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TenantRow::into_tenant).collect()
    }

    /// The tenant's default email profile. Required for every tenant.
    pub async fn email_profile(&self, tenant_id: &str) -> StoreResult<EmailProfileRow> {
        let row: Option<EmailProfileRow> = sqlx::query_as(
            "SELECT tenant_id, host, port, username_ct, password_ct, from_address \
             FROM email_profiles WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)
    }

    /// The tenant's SMS profile, if SMS is enabled for it.
    pub async fn sms_profile(&self, tenant_id: &str) -> StoreResult<Option<SmsProfileRow>> {
        let row: Option<SmsProfileRow> = sqlx::query_as(
            "SELECT tenant_id, account_sid_ct, auth_token_ct, from_number \
             FROM sms_profiles WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
