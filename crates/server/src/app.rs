use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use herald_crypto::SecretVault;
use herald_gateway::{
    NotificationDispatcher, NotificationPendingSource, Notifications, SenderRegistry,
};
use herald_runtime::RuntimeResolver;
use herald_scheduler::{Backoff, Scheduler, SchedulerConfig, SystemClock};
use herald_store::{Bootstrap, NotificationStore, TenantStore, connect, specs_from_yaml};

use crate::api::{self, ApiState};
use crate::config::HeraldConfig;
use crate::session::HttpSessionValidator;
use crate::web::{self, RuntimeInfo, WebState};

/// Wire every component and serve until shutdown.
///
/// Shutdown order: the scheduler context is cancelled first, then the two
/// listeners drain gracefully, then the storage handle closes.
pub async fn run(config: HeraldConfig) -> anyhow::Result<()> {
    let vault = Arc::new(
        SecretVault::from_hex(&config.master_key).context("masterKey is not a valid key")?,
    );
    let pool = connect(&config.database.path)
        .await
        .with_context(|| format!("cannot open database at {:?}", config.database.path))?;

    let resolver = Arc::new(RuntimeResolver::new(
        TenantStore::new(pool.clone()),
        vault.clone(),
    ));
    let mut bootstrap = Bootstrap::new(pool.clone(), vault);
    bootstrap.register(resolver.clone());

    let specs = match &config.tenants_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read tenants file {path:?}"))?;
            specs_from_yaml(&text).context("tenants file")?
        }
        None => config.tenants.clone(),
    };
    bootstrap.apply(&specs).await.context("tenant bootstrap")?;

    let registry = Arc::new(SenderRegistry::new());
    let store = NotificationStore::new(pool.clone());
    let clock = Arc::new(SystemClock);
    let notifications = Arc::new(Notifications::new(
        store.clone(),
        registry.clone(),
        clock.clone(),
    ));

    let interval = Duration::from_secs(config.scheduler.interval_seconds.max(1));
    let scheduler = Scheduler::new(
        SchedulerConfig {
            interval,
            max_retries: config.scheduler.max_retries,
            success_status: "sent".to_owned(),
            failure_status: "errored".to_owned(),
            fan_out: config.scheduler.fan_out.max(1),
            backoff: Backoff {
                base: interval,
                factor: config.scheduler.backoff_factor,
                cap: Duration::from_secs(config.scheduler.backoff_cap_seconds),
            },
        },
        Arc::new(NotificationPendingSource::new(store, resolver.clone())),
        Arc::new(NotificationDispatcher::new(resolver.clone(), registry)),
        clock,
    );
    let scheduler_token = CancellationToken::new();
    let scheduler_handle = tokio::spawn({
        let token = scheduler_token.clone();
        async move { scheduler.run(token).await }
    });

    let api_state = ApiState {
        notifications: notifications.clone(),
        resolver: resolver.clone(),
        bearer_token: Arc::from(config.api.bearer_token.as_str()),
    };
    let web_state = WebState {
        notifications,
        resolver,
        session: Arc::new(HttpSessionValidator::new(
            config.web.effective_session_validate_url(),
        )),
        info: Arc::new(RuntimeInfo {
            api_base_url: config.web.api_base_url.clone(),
            tauth_base_url: config.web.tauth_base_url.clone(),
            tauth_tenant_id: config.web.tauth_tenant_id.clone(),
            google_client_id: config.web.google_client_id.clone(),
        }),
    };

    let api_listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("cannot bind api listener on {:?}", config.api.listen))?;
    let web_listener = tokio::net::TcpListener::bind(&config.web.listen)
        .await
        .with_context(|| format!("cannot bind web listener on {:?}", config.web.listen))?;
    info!(api = %config.api.listen, web = %config.web.listen, "herald listening");

    let listeners_token = CancellationToken::new();
    tokio::spawn({
        let scheduler_token = scheduler_token.clone();
        let listeners_token = listeners_token.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            // Scheduler first, so no new attempts start while the front
            // doors drain.
            scheduler_token.cancel();
            listeners_token.cancel();
        }
    });

    let api_server = axum::serve(api_listener, api::router(api_state)).with_graceful_shutdown({
        let token = listeners_token.clone();
        async move { token.cancelled().await }
    });
    let web_server = axum::serve(web_listener, web::router(web_state)).with_graceful_shutdown({
        let token = listeners_token.clone();
        async move { token.cancelled().await }
    });
    tokio::try_join!(async { api_server.await }, async { web_server.await }).context("serve")?;

    scheduler_token.cancel();
    let _ = scheduler_handle.await;
    pool.close().await;
    info!("herald stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
