//! Session cookie helpers.
//!
//! The session token travels in an `HttpOnly`, `SameSite=Lax` cookie scoped
//! to the application's base path.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

/// Cookie name for bridge sessions.
pub const SESSION_COOKIE_NAME: &str = "b2c_bridge_session";

/// Build the `Set-Cookie` value carrying a session token.
#[must_use]
pub fn create_session_cookie(token: &str, path: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE_NAME}={token}; HttpOnly{secure_flag}; SameSite=Lax; Path={path}")
}

/// Build the `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn clear_session_cookie(path: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE_NAME}=; HttpOnly{secure_flag}; SameSite=Lax; Path={path}; Max-Age=0"
    )
}

/// Append a `Set-Cookie` header. Values that are not valid header text are
/// dropped with a warning.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(_) => tracing::warn!("Refusing to set cookie with invalid header characters"),
    }
}

/// Extract the session token from request cookies.
#[must_use]
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE_NAME}=");
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|part| part.trim().strip_prefix(prefix.as_str()))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(String::from)
}
