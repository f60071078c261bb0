//! Local user record written by the provisioning flow.

use serde::{Deserialize, Serialize};

/// Local permission set carried by users and session tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub modify: bool,
    #[serde(default)]
    pub share: bool,
    #[serde(default)]
    pub api: bool,
}

/// How a user last authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    #[default]
    Password,
    Proxy,
    Oidc,
    B2c,
}

/// A user as persisted by the user store.
///
/// Provider tokens are stored encrypted by the token vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedUser {
    /// Durable identifier assigned by the store. Zero until persisted.
    pub id: u64,
    pub username: String,
    pub permissions: Permissions,
    pub login_method: LoginMethod,
    pub provider_access_token: String,
    pub provider_refresh_token: String,
    /// Provider token expiry as epoch seconds.
    pub provider_token_expiry: i64,
}

/// Fields of [`ProvisionedUser`] an update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    ProviderAccessToken,
    ProviderRefreshToken,
    ProviderTokenExpiry,
    LoginMethod,
    Permissions,
}

impl UserField {
    /// Fields rewritten on every returning login.
    pub const LOGIN_SYNC: [UserField; 5] = [
        UserField::ProviderAccessToken,
        UserField::ProviderRefreshToken,
        UserField::ProviderTokenExpiry,
        UserField::LoginMethod,
        UserField::Permissions,
    ];
}
