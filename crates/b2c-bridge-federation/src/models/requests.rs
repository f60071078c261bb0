//! Query parameters accepted by the bridge routes.

use serde::Deserialize;

/// `GET /login` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginParams {
    /// Where to send the user once the session is established.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// `GET /callback` query as sent by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}
