//! Authorization-code flow against the B2C tenant: building the provider
//! redirect, exchanging the returned code and reading the ID token.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::error::{FederationError, FederationResult};
use crate::models::{FlowState, IdentityClaims};
use crate::services::discovery::{DiscoveryService, ProviderEndpoints};

/// Callback route, relative to the application's base path.
pub const CALLBACK_PATH: &str = "api/auth/b2c/callback";

/// Scope that makes the provider issue a refresh token.
const OFFLINE_ACCESS: &str = "offline_access";

/// Upper bound on the encoded ID-token payload.
const MAX_ENCODED_PAYLOAD: usize = 128 * 1024;
/// Upper bound on the decoded ID-token payload.
const MAX_DECODED_PAYLOAD: usize = 64 * 1024;
/// Upper bound on the number of claims accepted from one ID token.
const MAX_CLAIMS: usize = 100;
/// Upper bound on provider error bodies copied into logs.
const MAX_LOGGED_BODY: usize = 500;

/// Prefix length of codes and state values written to logs.
pub const LOG_TRUNCATE_LEN: usize = 20;

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

/// Drives the provider side of a login.
#[derive(Clone)]
pub struct AuthFlowService {
    http: reqwest::Client,
    discovery: DiscoveryService,
    enabled: bool,
    client_secret: String,
    exchange_timeout: Duration,
}

impl AuthFlowService {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        discovery: DiscoveryService,
        enabled: bool,
        client_secret: impl Into<String>,
        exchange_timeout: Duration,
    ) -> Self {
        Self {
            http,
            discovery,
            enabled,
            client_secret: client_secret.into(),
            exchange_timeout,
        }
    }

    /// Fail with [`FederationError::Disabled`] when the integration is off.
    pub fn ensure_enabled(&self) -> FederationResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(FederationError::Disabled)
        }
    }

    /// Build the provider URL the browser is sent to.
    #[instrument(skip(self, redirect))]
    pub async fn begin_login(
        &self,
        callback_url: &str,
        redirect: Option<String>,
    ) -> FederationResult<String> {
        self.ensure_enabled()?;

        let login_url = self.discovery.login_url().await?;
        let state = FlowState::new(redirect);
        let target = rewrite_authorization_url(&login_url, callback_url, &state.encode())?;

        tracing::info!(
            nonce = %truncate_for_log(&state.nonce, LOG_TRUNCATE_LEN),
            has_redirect = state.redirect.is_some(),
            "Redirecting to identity provider"
        );

        Ok(target)
    }

    /// Re-discover the login URL and derive the client id and token URL.
    pub async fn resolve_endpoints(&self) -> FederationResult<ProviderEndpoints> {
        let login_url = self.discovery.login_url().await?;
        ProviderEndpoints::from_login_url(&login_url)
    }

    /// Exchange an authorization code at the token endpoint. Not retried.
    #[instrument(skip(self, endpoints, code), fields(token_url = %endpoints.token_url))]
    pub async fn exchange_code(
        &self,
        endpoints: &ProviderEndpoints,
        code: &str,
        callback_url: &str,
    ) -> FederationResult<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", endpoints.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", callback_url),
        ];

        let response = self
            .http
            .post(&endpoints.token_url)
            .timeout(self.exchange_timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    code = %truncate_for_log(code, LOG_TRUNCATE_LEN),
                    "Token endpoint unreachable"
                );
                FederationError::CodeExchangeFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                code = %truncate_for_log(code, LOG_TRUNCATE_LEN),
                error = %truncate_for_log(&error_text, MAX_LOGGED_BODY),
                "Token exchange failed"
            );
            return Err(FederationError::CodeExchangeFailed(format!(
                "Token endpoint returned HTTP {status}"
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| FederationError::CodeExchangeFailed(e.to_string()))?;

        tracing::debug!(
            has_refresh_token = tokens.refresh_token.is_some(),
            has_id_token = tokens.id_token.is_some(),
            "Token exchange succeeded"
        );

        Ok(tokens)
    }
}

/// Absolute callback URL for a request arriving from `origin`.
#[must_use]
pub fn callback_url(origin: &str, base_path: &str) -> String {
    format!("{}{}{}", origin.trim_end_matches('/'), base_path, CALLBACK_PATH)
}

/// Rewrite the discovered login URL so the provider answers with a code in
/// the query string to `callback_url`, carrying `state`.
///
/// Parameters already present are replaced in place; missing ones are
/// appended.
pub fn rewrite_authorization_url(
    login_url: &str,
    callback_url: &str,
    state: &str,
) -> FederationResult<String> {
    let mut url =
        Url::parse(login_url).map_err(|e| FederationError::MalformedRedirect(e.to_string()))?;

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    let scope = pairs
        .iter()
        .find(|(k, _)| k == "scope")
        .map(|(_, v)| with_offline_access(v))
        .unwrap_or_else(|| OFFLINE_ACCESS.to_string());

    set_param(&mut pairs, "redirect_uri", callback_url);
    set_param(&mut pairs, "response_type", "code");
    set_param(&mut pairs, "response_mode", "query");
    set_param(&mut pairs, "scope", &scope);
    set_param(&mut pairs, "state", state);

    url.query_pairs_mut().clear().extend_pairs(pairs.iter());

    Ok(url.into())
}

fn with_offline_access(scope: &str) -> String {
    let scope = scope.trim();
    if scope.split_whitespace().any(|s| s == OFFLINE_ACCESS) {
        scope.to_string()
    } else if scope.is_empty() {
        OFFLINE_ACCESS.to_string()
    } else {
        format!("{scope} {OFFLINE_ACCESS}")
    }
}

fn set_param(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    let mut seen = false;
    pairs.retain_mut(|(k, v)| {
        if k.as_str() != key {
            return true;
        }
        if seen {
            return false;
        }
        seen = true;
        *v = value.to_string();
        true
    });
    if !seen {
        pairs.push((key.to_string(), value.to_string()));
    }
}

/// Decode the ID token payload without checking its signature.
///
/// The token was received directly from the provider's token endpoint; its
/// signature is not verified against the provider's published keys.
pub fn decode_id_token_claims(id_token: &str) -> FederationResult<IdentityClaims> {
    let parts: Vec<&str> = id_token.split('.').collect();
    if parts.len() != 3 {
        return Err(FederationError::InvalidIdToken(
            "Invalid JWT format".to_string(),
        ));
    }

    let encoded = parts[1].trim_end_matches('=');
    if encoded.len() > MAX_ENCODED_PAYLOAD {
        return Err(FederationError::InvalidIdToken(
            "ID token payload exceeds maximum size".to_string(),
        ));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| FederationError::InvalidIdToken(e.to_string()))?;

    if payload.len() > MAX_DECODED_PAYLOAD {
        return Err(FederationError::InvalidIdToken(
            "ID token payload exceeds maximum size".to_string(),
        ));
    }

    let claims: IdentityClaims = serde_json::from_slice(&payload)
        .map_err(|e| FederationError::InvalidIdToken(e.to_string()))?;

    if claims.len() > MAX_CLAIMS {
        return Err(FederationError::InvalidIdToken(
            "Too many claims".to_string(),
        ));
    }

    Ok(claims)
}

/// First `max` characters of `value`, marked when cut.
#[must_use]
pub fn truncate_for_log(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &value[..end]),
        None => value.to_string(),
    }
}
