//! Embedded persistence for Herald.
//!
//! A single SQLite database holds tenants, their domains and credential
//! profiles, and every notification with its attachments. The multi-tenant
//! isolation contract is enforced here: every notification and attachment
//! query filters by tenant id first.

pub mod bootstrap;
pub mod db;
pub mod error;
pub mod model;
pub mod notifications;
pub mod tenants;

pub use bootstrap::{
    Bootstrap, BootstrapError, EmailProfileSpec, SmsProfileSpec, TenantSpec, normalize_domain,
    specs_from_yaml,
};
pub use db::{connect, connect_in_memory, run_migrations};
pub use error::StoreError;
pub use notifications::NotificationStore;
pub use tenants::TenantStore;
