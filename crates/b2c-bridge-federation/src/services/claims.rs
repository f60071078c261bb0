//! Interpretation of provider identity claims.

use chrono::Utc;
use serde_json::Value;

use crate::models::IdentityClaims;

/// Claim read for groups when no admin claim name is configured.
pub const DEFAULT_GROUPS_CLAIM: &str = "roles";

/// Claims tried, in order, for the local username.
const USERNAME_CLAIMS: [&str; 3] = ["preferred_username", "email", "sub"];

/// Fallback provider-token lifetime when the ID token carries no `exp`.
const DEFAULT_EXPIRY_SECS: i64 = 3600;

/// Pick the local username: `preferred_username`, then `email`, then `sub`.
///
/// Returns an empty string when none holds a non-empty string.
#[must_use]
pub fn extract_username(claims: &IdentityClaims) -> String {
    USERNAME_CLAIMS
        .iter()
        .filter_map(|name| claims.get(*name).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(String::from)
        .unwrap_or_default()
}

/// Read groups from `claim_name` (or [`DEFAULT_GROUPS_CLAIM`] when empty).
///
/// Arrays keep their string elements in order; a string is split on `,`.
#[must_use]
pub fn extract_groups(claims: &IdentityClaims, claim_name: &str) -> Vec<String> {
    let claim_name = if claim_name.is_empty() {
        DEFAULT_GROUPS_CLAIM
    } else {
        claim_name
    };

    match claims.get(claim_name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => s.split(',').map(String::from).collect(),
        _ => Vec::new(),
    }
}

/// Admin iff both the claim name and value are configured and the value is
/// among `groups`.
#[must_use]
pub fn derive_admin(groups: &[String], admin_claim: &str, admin_claim_value: &str) -> bool {
    if admin_claim.is_empty() || admin_claim_value.is_empty() {
        return false;
    }
    groups.iter().any(|g| g == admin_claim_value)
}

/// Provider token expiry: numeric `exp`, otherwise one hour from `now`.
#[must_use]
pub fn derive_expiry_at(claims: &IdentityClaims, now: i64) -> i64 {
    claims
        .get("exp")
        .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64)))
        .unwrap_or(now + DEFAULT_EXPIRY_SECS)
}

/// [`derive_expiry_at`] evaluated against the current time.
#[must_use]
pub fn derive_expiry(claims: &IdentityClaims) -> i64 {
    derive_expiry_at(claims, Utc::now().timestamp())
}
