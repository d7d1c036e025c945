//! Router-level tests for both front doors, driven through `oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use herald_crypto::SecretVault;
use herald_gateway::testing::{MemoryEmailSender, MemorySmsSender};
use herald_gateway::{Notifications, SenderRegistry};
use herald_runtime::RuntimeResolver;
use herald_scheduler::SystemClock;
use herald_store::{
    Bootstrap, EmailProfileSpec, NotificationStore, TenantSpec, TenantStore, connect_in_memory,
};

use crate::api::{self, ApiState};
use crate::session::{SessionError, SessionValidator};
use crate::web::{self, RuntimeInfo, WebState};

const TOKEN: &str = "test-bearer-token";

struct AllowAll;

#[async_trait]
impl SessionValidator for AllowAll {
    async fn validate(&self, _session: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

struct RejectAll;

#[async_trait]
impl SessionValidator for RejectAll {
    async fn validate(&self, _session: &str) -> Result<(), SessionError> {
        Err(SessionError("expired".to_owned()))
    }
}

fn spec(id: &str) -> TenantSpec {
    TenantSpec {
        id: id.to_owned(),
        display_name: format!("Tenant {id}"),
        support_email: None,
        enabled: true,
        domains: vec![format!("{id}.example")],
        email_profile: EmailProfileSpec {
            host: "smtp.example.com".to_owned(),
            port: 587,
            username: "u".to_owned(),
            password: "p".to_owned(),
            from: format!("no-reply@{id}.example"),
        },
        sms_profile: None,
        status: None,
    }
}

struct Harness {
    api: Router,
    web: Router,
    web_rejecting: Router,
}

async fn harness() -> Harness {
    let pool = connect_in_memory().await.unwrap();
    let vault = Arc::new(SecretVault::from_hex(&"11".repeat(32)).unwrap());
    let resolver = Arc::new(RuntimeResolver::new(
        TenantStore::new(pool.clone()),
        vault.clone(),
    ));
    let mut bootstrap = Bootstrap::new(pool.clone(), vault);
    bootstrap.register(resolver.clone());
    bootstrap.apply(&[spec("t1"), spec("t2")]).await.unwrap();

    let registry = Arc::new(
        SenderRegistry::new()
            .with_default_email_sender(Arc::new(MemoryEmailSender::succeeding_with_id("prov-1")))
            .with_default_sms_sender(Arc::new(MemorySmsSender::succeeding())),
    );
    let notifications = Arc::new(Notifications::new(
        NotificationStore::new(pool),
        registry,
        Arc::new(SystemClock),
    ));

    let api = api::router(ApiState {
        notifications: notifications.clone(),
        resolver: resolver.clone(),
        bearer_token: Arc::from(TOKEN),
    });

    let info = Arc::new(RuntimeInfo {
        api_base_url: "https://api.example.com".to_owned(),
        tauth_base_url: "https://auth.example.com".to_owned(),
        tauth_tenant_id: "auth-tenant".to_owned(),
        google_client_id: "client-1".to_owned(),
    });
    let web = web::router(WebState {
        notifications: notifications.clone(),
        resolver: resolver.clone(),
        session: Arc::new(AllowAll),
        info: info.clone(),
    });
    let web_rejecting = web::router(WebState {
        notifications,
        resolver,
        session: Arc::new(RejectAll),
        info,
    });

    Harness {
        api,
        web,
        web_rejecting,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn api_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header("x-tenant-id", "t1");
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

fn send_body(message: &str) -> serde_json::Value {
    serde_json::json!({
        "tenant_id": "t1",
        "type": "email",
        "recipient": "user@example.com",
        "subject": "hi",
        "message": message,
    })
}

// ---------------------------------------------------------------------------
// API surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_rejects_missing_malformed_and_wrong_tokens() {
    let h = harness().await;

    let no_header = Request::builder()
        .method("GET")
        .uri("/v1/notifications")
        .body(Body::empty())
        .unwrap();
    let response = h.api.clone().oneshot(no_header).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthenticated");

    let malformed = Request::builder()
        .method("GET")
        .uri("/v1/notifications")
        .header(header::AUTHORIZATION, format!("Token {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = h.api.clone().oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .method("GET")
        .uri("/v1/notifications")
        .header(header::AUTHORIZATION, "Bearer nope")
        .header("x-tenant-id", "t1")
        .body(Body::empty())
        .unwrap();
    let response = h.api.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_send_get_list_roundtrip() {
    let h = harness().await;

    let response = h
        .api
        .clone()
        .oneshot(api_request("POST", "/v1/notifications", Some(send_body("m1"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sent = body_json(response).await;
    assert_eq!(sent["status"], "sent");
    assert_eq!(sent["retry_count"], 0);
    assert_eq!(sent["provider_message_id"], "prov-1");
    let id = sent["notification_id"].as_str().unwrap().to_owned();

    let response = h
        .api
        .clone()
        .oneshot(api_request("GET", &format!("/v1/notifications/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["notification_id"], id.as_str());

    let response = h
        .api
        .clone()
        .oneshot(api_request("GET", "/v1/notifications?status=sent&status=queued", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed["notifications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn api_enforces_tenant_isolation() {
    let h = harness().await;

    let response = h
        .api
        .clone()
        .oneshot(api_request("POST", "/v1/notifications", Some(send_body("m1"))))
        .await
        .unwrap();
    let id = body_json(response).await["notification_id"]
        .as_str()
        .unwrap()
        .to_owned();

    // The same id under tenant t2 does not exist.
    let cross = Request::builder()
        .method("GET")
        .uri(format!("/v1/notifications/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header("x-tenant-id", "t2")
        .body(Body::empty())
        .unwrap();
    let response = h.api.clone().oneshot(cross).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn api_requires_a_tenant_and_knows_unknown_tenants() {
    let h = harness().await;

    let missing = Request::builder()
        .method("GET")
        .uri("/v1/notifications")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = h.api.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_argument");

    let unknown = Request::builder()
        .method("GET")
        .uri("/v1/notifications")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header("x-tenant-id", "ghost")
        .body(Body::empty())
        .unwrap();
    let response = h.api.clone().oneshot(unknown).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_reschedule_and_cancel_mappings() {
    let h = harness().await;

    // A scheduled (queued) notification to edit.
    let mut body = send_body("m1");
    body["scheduled_time"] = serde_json::json!("2030-01-01T00:00:00Z");
    let response = h
        .api
        .clone()
        .oneshot(api_request("POST", "/v1/notifications", Some(body)))
        .await
        .unwrap();
    let queued = body_json(response).await;
    assert_eq!(queued["status"], "queued");
    let id = queued["notification_id"].as_str().unwrap().to_owned();

    // Malformed timestamp.
    let response = h
        .api
        .clone()
        .oneshot(api_request(
            "PATCH",
            &format!("/v1/notifications/{id}/schedule"),
            Some(serde_json::json!({"tenant_id": "t1", "scheduled_time": "tomorrow"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_argument");

    // Past timestamp.
    let response = h
        .api
        .clone()
        .oneshot(api_request(
            "PATCH",
            &format!("/v1/notifications/{id}/schedule"),
            Some(serde_json::json!({"tenant_id": "t1", "scheduled_time": "2001-01-01T00:00:00Z"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "schedule_in_past");

    // Valid future target.
    let response = h
        .api
        .clone()
        .oneshot(api_request(
            "PATCH",
            &format!("/v1/notifications/{id}/schedule"),
            Some(serde_json::json!({"tenant_id": "t1", "scheduled_time": "2031-01-01T00:00:00Z"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Cancel, then cancel again: conflict.
    let response = h
        .api
        .clone()
        .oneshot(api_request(
            "POST",
            &format!("/v1/notifications/{id}/cancel"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "cancelled");

    let response = h
        .api
        .clone()
        .oneshot(api_request(
            "POST",
            &format!("/v1/notifications/{id}/cancel"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "not_editable");
}

#[tokio::test]
async fn api_rejects_attachment_violations_with_their_code() {
    let h = harness().await;

    let attachments: Vec<serde_json::Value> = (0..11)
        .map(|i| serde_json::json!({"filename": format!("f{i}.bin"), "data": "AAAA"}))
        .collect();
    let mut body = send_body("m1");
    body["attachments"] = serde_json::json!(attachments);

    let response = h
        .api
        .clone()
        .oneshot(api_request("POST", "/v1/notifications", Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "attachments_count_exceeded");
}

// ---------------------------------------------------------------------------
// Web surface
// ---------------------------------------------------------------------------

fn web_request(method: &str, uri: &str, host: &str, cookie: bool) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(header::HOST, host);
    if cookie {
        builder = builder.header(header::COOKIE, "app_session=session-1");
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn healthz_needs_no_host_or_session() {
    let h = harness().await;
    let request = Request::builder()
        .method("GET")
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = h.web.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn unknown_host_is_tenant_not_found() {
    let h = harness().await;
    let response = h
        .web
        .clone()
        .oneshot(web_request("GET", "/runtime-config", "ghost.example", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "tenant_not_found");
}

#[tokio::test]
async fn runtime_config_reflects_the_host_tenant() {
    let h = harness().await;
    let response = h
        .web
        .clone()
        .oneshot(web_request("GET", "/runtime-config", "T1.Example:443", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["apiBaseUrl"], "https://api.example.com");
    assert_eq!(body["tenant"]["id"], "t1");
    assert_eq!(body["tenant"]["displayName"], "Tenant t1");
}

#[tokio::test]
async fn web_api_routes_require_a_valid_session() {
    let h = harness().await;

    let response = h
        .web
        .clone()
        .oneshot(web_request("GET", "/api/notifications", "t1.example", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");

    let response = h
        .web_rejecting
        .clone()
        .oneshot(web_request("GET", "/api/notifications", "t1.example", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = h
        .web
        .clone()
        .oneshot(web_request("GET", "/api/notifications", "t1.example", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["notifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn web_schedule_and_cancel_act_for_the_query_tenant() {
    let h = harness().await;

    // Create a queued notification for t2 through the API.
    let body = serde_json::json!({
        "tenant_id": "t2",
        "type": "email",
        "recipient": "user@example.com",
        "message": "m",
        "scheduled_time": "2030-01-01T00:00:00Z",
    });
    let response = h
        .api
        .clone()
        .oneshot(api_request("POST", "/v1/notifications", Some(body)))
        .await
        .unwrap();
    let id = body_json(response).await["notification_id"]
        .as_str()
        .unwrap()
        .to_owned();

    // Missing tenant_id query parameter.
    let response = h
        .web
        .clone()
        .oneshot(web_request(
            "POST",
            &format!("/api/notifications/{id}/cancel"),
            "t1.example",
            true,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "tenant_id is required");

    // Unknown acting tenant.
    let response = h
        .web
        .clone()
        .oneshot(web_request(
            "POST",
            &format!("/api/notifications/{id}/cancel?tenant_id=ghost"),
            "t1.example",
            true,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "tenant_not_found");

    // Reschedule with a malformed body.
    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/api/notifications/{id}/schedule?tenant_id=t2"))
        .header(header::HOST, "t1.example")
        .header(header::COOKIE, "app_session=session-1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"scheduled_time": "not-a-time"}"#))
        .unwrap();
    let response = h.web.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "scheduled_time must be RFC3339");

    // Acting on behalf of t2 from t1's host succeeds.
    let response = h
        .web
        .clone()
        .oneshot(web_request(
            "POST",
            &format!("/api/notifications/{id}/cancel?tenant_id=t2"),
            "t1.example",
            true,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "cancelled");
}
