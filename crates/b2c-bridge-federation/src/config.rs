//! Settings consumed by the B2C bridge.
//!
//! The bridge never reads process-wide configuration. The embedding
//! application builds a [`FederationSettings`] and hands it to
//! [`crate::FederationState::new`].

use serde::Deserialize;

use crate::models::Permissions;

/// Provider integration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationSettings {
    /// Whether the B2C login routes are active.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the intermediary discovery API.
    pub api_base_url: String,
    /// Client secret presented at the token endpoint.
    pub client_secret: String,
    /// Create unknown users on first login.
    #[serde(default = "default_create_user")]
    pub create_user: bool,
    /// Claim holding the user's groups/roles. Empty means unset.
    #[serde(default)]
    pub admin_claim: String,
    /// Value in `admin_claim` that grants admin. Empty means unset.
    #[serde(default)]
    pub admin_claim_value: String,
    /// 32-byte key for the token vault and for signing session tokens.
    pub auth_key: String,
    /// Session token lifetime in hours.
    #[serde(default = "default_token_expiration_hours")]
    pub token_expiration_hours: i64,
    /// Base path the application is served under, always ending in `/`.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Timeout for the authorization-code exchange, in seconds.
    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,
    /// Permissions given to users created by this bridge.
    #[serde(default)]
    pub user_defaults: Permissions,
}

fn default_create_user() -> bool {
    true
}

fn default_token_expiration_hours() -> i64 {
    2
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_exchange_timeout_secs() -> u64 {
    10
}

impl FederationSettings {
    /// Whether both halves of the admin claim mapping are configured.
    #[must_use]
    pub fn admin_mapping(&self) -> Option<(&str, &str)> {
        if self.admin_claim.is_empty() || self.admin_claim_value.is_empty() {
            None
        } else {
            Some((&self.admin_claim, &self.admin_claim_value))
        }
    }

    /// Normalize the base path so it starts and ends with `/`.
    #[must_use]
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }
}
