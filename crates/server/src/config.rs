use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use herald_store::TenantSpec;

/// Top-level configuration for the Herald server, loaded from a YAML file.
///
/// `${VAR}` references anywhere in the file are replaced from the process
/// environment before parsing; an unset variable fails the load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeraldConfig {
    /// Embedded database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 32-byte master encryption key, hex-encoded.
    pub master_key: String,

    /// Notification API listener.
    #[serde(default)]
    pub api: ApiConfig,

    /// Tenant web UI listener.
    #[serde(default)]
    pub web: WebConfig,

    /// Retry scheduler tuning.
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Default tracing filter (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline tenant specifications.
    #[serde(default)]
    pub tenants: Vec<TenantSpec>,

    /// Alternative to inline `tenants`: path to a YAML file holding the list.
    #[serde(default)]
    pub tenants_file: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Bind address for the notification API.
    #[serde(default = "default_api_listen")]
    pub listen: String,
    /// Static bearer token API callers must present.
    #[serde(default)]
    pub bearer_token: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
            bearer_token: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebConfig {
    /// Bind address for the tenant web surface.
    #[serde(default = "default_web_listen")]
    pub listen: String,
    /// Base URL of the notification API, exposed to the browser UI.
    #[serde(default)]
    pub api_base_url: String,
    /// Base URL of the external session/auth service.
    #[serde(default)]
    pub tauth_base_url: String,
    /// Tenant id registered with the session/auth service.
    #[serde(default)]
    pub tauth_tenant_id: String,
    /// OAuth client id exposed to the browser UI.
    #[serde(default)]
    pub google_client_id: String,
    /// Endpoint validating `app_session` cookies. Defaults to the session
    /// service's validate route under `tauthBaseUrl`.
    #[serde(default)]
    pub session_validate_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_web_listen(),
            api_base_url: String::new(),
            tauth_base_url: String::new(),
            tauth_tenant_id: String::new(),
            google_client_id: String::new(),
            session_validate_url: None,
        }
    }
}

impl WebConfig {
    /// The effective session validation endpoint.
    #[must_use]
    pub fn effective_session_validate_url(&self) -> String {
        self.session_validate_url.clone().unwrap_or_else(|| {
            format!(
                "{}/api/session/validate",
                self.tauth_base_url.trim_end_matches('/')
            )
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSection {
    /// Seconds between scheduler ticks.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Retry budget per notification.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Maximum concurrent delivery attempts per tick.
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
    /// Exponential backoff factor between retries of one notification.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Upper bound on the backoff delay, in seconds.
    #[serde(default = "default_backoff_cap_seconds")]
    pub backoff_cap_seconds: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            max_retries: default_max_retries(),
            fan_out: default_fan_out(),
            backoff_factor: default_backoff_factor(),
            backoff_cap_seconds: default_backoff_cap_seconds(),
        }
    }
}

fn default_db_path() -> String {
    "herald.db".to_owned()
}

fn default_api_listen() -> String {
    "127.0.0.1:8080".to_owned()
}

fn default_web_listen() -> String {
    "127.0.0.1:8081".to_owned()
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_fan_out() -> usize {
    8
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_backoff_cap_seconds() -> u64 {
    900
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Errors loading or interpolating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(String),

    #[error("environment variable {0:?} referenced in config is not set")]
    UnsetVariable(String),
}

impl HeraldConfig {
    /// Read, interpolate, and parse the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    /// Parse configuration from raw YAML text.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env(raw)?;
        serde_yaml_ng::from_str(&expanded).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Replace every `${VAR}` reference with the variable's value.
fn expand_env(raw: &str) -> Result<String, ConfigError> {
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env pattern is valid");

    let mut result = String::with_capacity(raw.len());
    let mut last = 0;
    for captures in pattern.captures_iter(raw) {
        let whole = captures.get(0).expect("match present");
        let name = &captures[1];
        let value = std::env::var(name)
            .map_err(|_| ConfigError::UnsetVariable(name.to_owned()))?;
        result.push_str(&raw[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&raw[last..]);
    Ok(result)
}
