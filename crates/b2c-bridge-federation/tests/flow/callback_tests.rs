//! Callback state machine tests.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::*;
use b2c_bridge_federation::services::ProvisioningService;
use b2c_bridge_federation::{
    InMemoryUserStore, LoginMethod, Permissions, SessionIssuer, TokenVault, UserStore,
};

const CALLBACK: &str = "/api/auth/b2c/callback?code=auth-code-123&state=n0nce%3A%2Ffiles%2Fdocs";

#[tokio::test]
async fn test_callback_creates_user_and_sets_session() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-123"))
        .and(body_string_contains("client_id=abc"))
        .and(body_string_contains("client_secret=s3cret"))
        .and(body_string_contains(
            "redirect_uri=https%3A%2F%2Ffiles.example.com%2Fapi%2Fauth%2Fb2c%2Fcallback",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_response(&alice_claims(&["staff"]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryUserStore::new());
    let router = bridge(settings(&server), store.clone());

    let response = get(&router, CALLBACK).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/files/docs");

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[0].contains("SameSite=Lax"));
    assert!(cookies[0].contains("Path=/"));
    assert!(cookies[0].contains("; Secure"));

    let user = store.get("alice").await.unwrap().expect("alice provisioned");
    assert_eq!(user.login_method, LoginMethod::B2c);
    assert!(!user.permissions.admin);
    assert!(user.permissions.modify);
    assert_ne!(user.provider_access_token, "provider-access");

    let claims = SessionIssuer::with_hours(AUTH_KEY.as_bytes(), 2)
        .unwrap()
        .verify(&session_token(&response))
        .unwrap();
    assert_eq!(claims.belongs_to, user.id);
    assert_eq!(claims.permissions, user.permissions);
}

#[tokio::test]
async fn test_callback_stores_decryptable_provider_tokens() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(&server, token_response(&alice_claims(&[]))).await;

    let store = Arc::new(InMemoryUserStore::new());
    let router = bridge(settings(&server), store.clone());
    assert_eq!(get(&router, CALLBACK).await.status(), StatusCode::FOUND);

    let provisioning = ProvisioningService::new(
        store,
        TokenVault::new(AUTH_KEY.as_bytes()).unwrap(),
        true,
        Permissions::default(),
    );
    let tokens = provisioning.provider_tokens("alice").await.unwrap().unwrap();
    assert_eq!(tokens.access_token, "provider-access");
    assert_eq!(tokens.refresh_token, "provider-refresh");
}

#[tokio::test]
async fn test_second_callback_updates_existing_user() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(&server, token_response(&alice_claims(&["admin"]))).await;

    let store = Arc::new(InMemoryUserStore::new());
    let router = bridge(settings(&server), store.clone());

    let first = get(&router, CALLBACK).await;
    let second = get(&router, CALLBACK).await;
    assert_eq!(first.status(), StatusCode::FOUND);
    assert_eq!(second.status(), StatusCode::FOUND);

    assert_eq!(store.len().await, 1);

    let issuer = SessionIssuer::with_hours(AUTH_KEY.as_bytes(), 2).unwrap();
    let a = issuer.verify(&session_token(&first)).unwrap();
    let b = issuer.verify(&session_token(&second)).unwrap();
    assert_eq!(a.belongs_to, b.belongs_to);
    assert!(b.permissions.admin);
}

#[tokio::test]
async fn test_admin_not_revoked_by_later_login() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    let store = Arc::new(InMemoryUserStore::new());
    let router = bridge(settings(&server), store.clone());

    let admin_login = Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_response(&alice_claims(&["admin"]))),
        )
        .up_to_n_times(1)
        .mount_as_scoped(&server)
        .await;
    assert_eq!(get(&router, CALLBACK).await.status(), StatusCode::FOUND);
    drop(admin_login);

    mount_token_endpoint(&server, token_response(&alice_claims(&["staff"]))).await;
    assert_eq!(get(&router, CALLBACK).await.status(), StatusCode::FOUND);

    let user = store.get("alice").await.unwrap().unwrap();
    assert!(user.permissions.admin);
}

#[tokio::test]
async fn test_callback_without_state_redirects_to_base_path() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(&server, token_response(&alice_claims(&[]))).await;

    let mut settings = settings(&server);
    settings.base_path = "drive".to_string();
    let router = bridge(settings, Arc::new(InMemoryUserStore::new()));

    let response = get_with(
        &router,
        "/drive/api/auth/b2c/callback?code=c",
        &[("host", "files.example.com")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/drive/");
    let cookie = &set_cookies(&response)[0];
    assert!(cookie.contains("Path=/drive/"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn test_callback_ignores_offsite_redirect() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(&server, token_response(&alice_claims(&[]))).await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(
        &router,
        "/api/auth/b2c/callback?code=c&state=n0nce%3Ahttps%3A%2F%2Fevil.example%2F",
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_callback_ignores_redirect_with_embedded_control_chars() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(&server, token_response(&alice_claims(&[]))).await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    for state in ["n%3A%2F%09%2Fevil.example", "n%3A%2F%0A%2Fevil.example"] {
        let response = get(&router, &format!("/api/auth/b2c/callback?code=c&state={state}")).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn test_callback_without_code_serves_recovery_page() {
    let server = MockServer::start().await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    for uri in ["/api/auth/b2c/callback", "/api/auth/b2c/callback?code=&state=n%3A"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        assert!(set_cookies(&response).is_empty());

        let body = body_string(response).await;
        assert!(body.contains("window.location.hash"));
        assert!(body.contains("Missing authorization code"));
    }
}

#[tokio::test]
async fn test_callback_provider_error_is_bad_request() {
    let server = MockServer::start().await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(
        &router,
        "/api/auth/b2c/callback?error=access_denied&error_description=%3Cscript%3Ealert(1)%3C%2Fscript%3E",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("idp_error"));
    assert!(!body.contains("script"));
}

#[tokio::test]
async fn test_callback_auto_create_disabled_is_forbidden() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(&server, token_response(&alice_claims(&[]))).await;

    let mut settings = settings(&server);
    settings.create_user = false;
    let store = Arc::new(InMemoryUserStore::new());
    let router = bridge(settings, store.clone());

    let response = get(&router, CALLBACK).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_cookies(&response).is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_callback_without_id_token_fails() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(
        &server,
        json!({ "access_token": "a", "refresh_token": "r", "token_type": "Bearer" }),
    )
    .await;
    let store = Arc::new(InMemoryUserStore::new());
    let router = bridge(settings(&server), store.clone());

    let response = get(&router, CALLBACK).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
    assert!(body_string(response).await.contains("no_id_token"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_callback_without_username_claim_fails() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    mount_token_endpoint(
        &server,
        token_response(&json!({ "roles": ["admin"], "exp": 1_900_000_000 })),
    )
    .await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(&router, CALLBACK).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("no_username"));
}

#[tokio::test]
async fn test_callback_rejected_code_fails() {
    let server = MockServer::start().await;
    mount_login_url(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADB2C90080: The provided grant has expired."
        })))
        .mount(&server)
        .await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(&router, CALLBACK).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains("token_exchange_failed"));
    assert!(!body.contains("AADB2C90080"));
}

#[tokio::test]
async fn test_callback_discovery_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/NansenFile/LoginURL"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let router = bridge(settings(&server), Arc::new(InMemoryUserStore::new()));

    let response = get(&router, CALLBACK).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("discovery_failed"));
}

#[tokio::test]
async fn test_callback_disabled_is_forbidden() {
    let server = MockServer::start().await;
    let mut settings = settings(&server);
    settings.enabled = false;
    let router = bridge(settings, Arc::new(InMemoryUserStore::new()));

    let response = get(&router, CALLBACK).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
