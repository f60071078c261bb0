//! Login initiator tests.

use std::sync::Arc;

use axum::http::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::*;
use b2c_bridge_federation::InMemoryUserStore;

#[tokio::test]
async fn test_login_redirects_to_rewritten_provider_url() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(&router, "/api/auth/b2c/login?redirect=%2Ffiles%2Fdocs").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response);
    assert!(target.starts_with(&format!(
        "{}/tenant/B2C_1_signin/oauth2/v2.0/authorize?",
        server.uri()
    )));

    assert_eq!(query_param(&target, "client_id").as_deref(), Some("abc"));
    assert_eq!(query_param(&target, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(&target, "response_mode").as_deref(), Some("query"));
    assert_eq!(
        query_param(&target, "scope").as_deref(),
        Some("openid offline_access")
    );
    assert_eq!(
        query_param(&target, "redirect_uri").as_deref(),
        Some("https://files.example.com/api/auth/b2c/callback")
    );

    let state = query_param(&target, "state").unwrap();
    let (nonce, redirect) = state.split_once(':').unwrap();
    assert_eq!(nonce.len(), 16);
    assert_eq!(redirect, "/files/docs");
}

#[tokio::test]
async fn test_login_callback_from_host_and_forwarded_proto() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    let mut settings = settings(&server);
    settings.base_path = "/drive".to_string();
    let router = bridge(settings, Arc::new(InMemoryUserStore::new()));

    let response = get_with(
        &router,
        "/drive/api/auth/b2c/login",
        &[("host", "files.internal:8443"), ("x-forwarded-proto", "https")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response);
    assert_eq!(
        query_param(&target, "redirect_uri").as_deref(),
        Some("https://files.internal:8443/drive/api/auth/b2c/callback")
    );
    assert!(query_param(&target, "state").unwrap().ends_with(':'));
}

#[tokio::test]
async fn test_login_disabled_is_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/NansenFile/LoginURL"))
        .respond_with(ResponseTemplate::new(200).set_body_string("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = settings(&server);
    settings.enabled = false;
    let router = bridge(settings, Arc::new(InMemoryUserStore::new()));

    let response = get(&router, "/api/auth/b2c/login").await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_string(response).await.contains("b2c_disabled"));
}

#[tokio::test]
async fn test_login_discovery_failure_is_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/NansenFile/LoginURL"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(&router, "/api/auth/b2c/login").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("discovery_failed"));
}

#[tokio::test]
async fn test_login_empty_discovery_body_is_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/NansenFile/LoginURL"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&server)
        .await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(&router, "/api/auth/b2c/login").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_login_unparseable_discovered_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/NansenFile/LoginURL"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not a url"))
        .mount(&server)
        .await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(&router, "/api/auth/b2c/login").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("invalid_provider_url"));
}

#[tokio::test]
async fn test_login_unreachable_discovery_api() {
    let server = MockServer::start().await;
    let mut settings = settings(&server);
    // Nothing listens on port 9 of localhost.
    settings.api_base_url = "http://127.0.0.1:9".to_string();
    let router = bridge(settings, Arc::new(InMemoryUserStore::new()));

    let response = get(&router, "/api/auth/b2c/login").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("discovery_failed"));
}
