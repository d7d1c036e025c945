use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::StoreResult;

/// Open (creating if missing) the embedded database at `path` and ensure the
/// schema exists.
pub async fn connect(path: &str) -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Open an in-memory database for tests.
///
/// The pool is pinned to a single connection: each SQLite `:memory:`
/// connection is its own database, so a larger pool would scatter tables.
pub async fn connect_in_memory() -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Create required tables and indexes if they do not exist.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    const DDL: &[&str] = &[
        "CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            support_email TEXT,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS tenant_domains (
            hostname TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants (id),
            is_default INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE TABLE IF NOT EXISTS email_profiles (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants (id),
            host TEXT NOT NULL,
            port INTEGER NOT NULL,
            username_ct BLOB NOT NULL,
            password_ct BLOB NOT NULL,
            from_address TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS sms_profiles (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants (id),
            account_sid_ct BLOB NOT NULL,
            auth_token_ct BLOB NOT NULL,
            from_number TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS notifications (
            pk INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id TEXT NOT NULL REFERENCES tenants (id),
            notification_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            recipient TEXT NOT NULL,
            subject TEXT,
            message TEXT NOT NULL,
            status TEXT NOT NULL,
            provider_message_id TEXT,
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_attempted_at TEXT,
            scheduled_for TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (tenant_id, notification_id)
        )",
        "CREATE TABLE IF NOT EXISTS notification_attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id TEXT NOT NULL,
            notification_id TEXT NOT NULL,
            filename TEXT NOT NULL,
            content_type TEXT NOT NULL,
            data BLOB NOT NULL,
            FOREIGN KEY (tenant_id, notification_id)
                REFERENCES notifications (tenant_id, notification_id)
                ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS notifications_tenant_status_idx
            ON notifications (tenant_id, status)",
        "CREATE INDEX IF NOT EXISTS attachments_tenant_notification_idx
            ON notification_attachments (tenant_id, notification_id)",
    ];

    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }
}
