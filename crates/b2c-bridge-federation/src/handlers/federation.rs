//! B2C login handlers.

use axum::{
    extract::{Query, State},
    http::{
        header::{AsHeaderName, HOST, LOCATION, ORIGIN},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use tracing::instrument;
use url::Url;

use crate::error::{FederationError, FederationResult};
use crate::handlers::cookie::{
    append_cookie, clear_session_cookie, create_session_cookie, extract_session_cookie,
};
use crate::models::{CallbackParams, FlowState, LoginParams};
use crate::router::FederationState;
use crate::services::auth_flow::{
    callback_url, decode_id_token_claims, truncate_for_log, LOG_TRUNCATE_LEN,
};
use crate::services::claims::{derive_admin, derive_expiry, extract_groups, extract_username};
use crate::services::ProvisionInput;

/// Served when the callback arrives without a code in the query string.
///
/// Providers that answer in fragment mode put the code after `#`, which never
/// reaches the server. The script moves the fragment into the query string
/// and reloads once.
pub const FRAGMENT_RECOVERY_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Signing in...</title></head>
<body>
<p id="status">Completing sign-in...</p>
<script>
(function () {
  var hash = window.location.hash;
  if (hash && hash.length > 1) {
    window.location.replace(window.location.pathname + "?" + hash.substring(1));
  } else {
    document.getElementById("status").textContent = "Missing authorization code";
  }
})();
</script>
</body>
</html>
"#;

/// Start a B2C login.
///
/// GET {base}api/auth/b2c/login
#[instrument(skip(state, headers))]
pub async fn login(
    State(state): State<FederationState>,
    headers: HeaderMap,
    Query(params): Query<LoginParams>,
) -> FederationResult<Response> {
    let callback = callback_url(&request_origin(&headers), &state.base_path);
    let target = state.auth_flow.begin_login(&callback, params.redirect).await?;

    Ok(found(target))
}

/// Handle the provider's redirect back to us.
///
/// GET {base}api/auth/b2c/callback
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<FederationState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> FederationResult<Response> {
    state.auth_flow.ensure_enabled()?;

    let code = params
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let Some(code) = code else {
        if let Some(error) = params.error.filter(|e| !e.is_empty()) {
            return Err(FederationError::IdpError {
                error,
                description: params
                    .error_description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        tracing::info!("No authorization code in query, serving fragment recovery page");
        return Ok(Html(FRAGMENT_RECOVERY_HTML).into_response());
    };

    let raw_state = params.state.unwrap_or_default();
    let flow = FlowState::parse(&raw_state);

    tracing::info!(
        code = %truncate_for_log(code, LOG_TRUNCATE_LEN),
        state = %truncate_for_log(&raw_state, LOG_TRUNCATE_LEN),
        "Handling B2C callback"
    );

    let callback = callback_url(&request_origin(&headers), &state.base_path);
    let endpoints = state.auth_flow.resolve_endpoints().await?;
    let tokens = state
        .auth_flow
        .exchange_code(&endpoints, code, &callback)
        .await?;

    let id_token = tokens
        .id_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(FederationError::NoIdentityAssertion)?;
    let claims = decode_id_token_claims(id_token)?;

    let username = extract_username(&claims);
    if username.is_empty() {
        return Err(FederationError::NoUsernameClaim);
    }

    let is_admin = state
        .settings
        .admin_mapping()
        .is_some_and(|(claim, value)| derive_admin(&extract_groups(&claims, claim), claim, value));

    let user = state
        .provisioning
        .provision(&ProvisionInput {
            username,
            is_admin,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.unwrap_or_default(),
            expires_at: derive_expiry(&claims),
        })
        .await?;

    let session = state.sessions.issue(&user)?;

    let target = flow
        .redirect
        .as_deref()
        .and_then(sanitize_redirect)
        .map_or_else(|| state.base_path.clone(), String::from);

    tracing::info!(
        user_id = user.id,
        username = %user.username,
        admin = user.permissions.admin,
        "B2C login complete"
    );

    let mut response = found(target);
    append_cookie(
        response.headers_mut(),
        &create_session_cookie(&session.token, &state.base_path, is_secure(&headers)),
    );
    Ok(response)
}

/// Drop the local session and send the browser to the provider's logout page.
///
/// GET {base}api/auth/b2c/logout
#[instrument(skip_all)]
pub async fn logout(State(state): State<FederationState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_cookie(&headers) {
        match state.sessions.verify(&token) {
            Ok(claims) => tracing::info!(user_id = claims.belongs_to, "Logging out B2C session"),
            Err(e) => tracing::debug!(error = %e, "Logout with unusable session cookie"),
        }
    }

    let target = if state.auth_flow.ensure_enabled().is_ok() {
        match state.discovery.logout_url().await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Logout URL discovery failed, redirecting to base path");
                state.base_path.clone()
            }
        }
    } else {
        state.base_path.clone()
    };

    let mut response = found(target);
    append_cookie(
        response.headers_mut(),
        &clear_session_cookie(&state.base_path, is_secure(&headers)),
    );
    response
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

/// Host used to resolve redirect targets; anything that resolves elsewhere
/// is not a relative path.
const REDIRECT_RESOLVE_BASE: &str = "http://bridge.invalid/";

/// Accept only same-site relative paths as post-login targets.
fn sanitize_redirect(redirect: &str) -> Option<&str> {
    let trimmed = redirect.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    // Browsers drop tabs and newlines while parsing, so "/\t/host" becomes "//host".
    if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return None;
    }
    // Protocol-relative URLs and backslash tricks.
    if trimmed.starts_with("//") || trimmed.starts_with("/\\") || trimmed.contains("://") {
        return None;
    }
    let base = Url::parse(REDIRECT_RESOLVE_BASE).ok()?;
    let resolved = base.join(trimmed).ok()?;
    if resolved.host_str() != base.host_str() || resolved.port() != base.port() {
        return None;
    }
    Some(trimmed)
}

fn header_str(headers: &HeaderMap, name: impl AsHeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Scheme the client used, honoring `X-Forwarded-Proto` from a proxy.
fn request_scheme(headers: &HeaderMap) -> String {
    header_str(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| "http".to_string())
}

/// Origin of the incoming request: the `Origin` header when present,
/// otherwise `scheme://host`.
fn request_origin(headers: &HeaderMap) -> String {
    if let Some(origin) = header_str(headers, ORIGIN).filter(|o| *o != "null") {
        return origin.to_string();
    }
    let host = header_str(headers, HOST).unwrap_or("localhost");
    format!("{}://{host}", request_scheme(headers))
}

fn is_secure(headers: &HeaderMap) -> bool {
    request_origin(headers).starts_with("https://")
}
