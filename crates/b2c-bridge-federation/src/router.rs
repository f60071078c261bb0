//! Router for the B2C login bridge.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};

use crate::config::FederationSettings;
use crate::error::FederationResult;
use crate::handlers::federation;
use crate::services::{
    AuthFlowService, DiscoveryService, ProvisioningService, SessionIssuer, TokenVault, UserStore,
};

/// Shared state for the bridge handlers.
#[derive(Clone)]
pub struct FederationState {
    pub settings: Arc<FederationSettings>,
    /// Normalized base path, always starting and ending with `/`.
    pub base_path: String,
    pub discovery: DiscoveryService,
    pub auth_flow: AuthFlowService,
    pub provisioning: ProvisioningService,
    pub sessions: SessionIssuer,
}

/// Configuration for the bridge router.
#[derive(Clone)]
pub struct FederationConfig {
    pub settings: FederationSettings,
    /// Store the bridge provisions users into.
    pub store: Arc<dyn UserStore>,
    /// HTTP client for discovery and the token endpoint. A default client is
    /// built when absent.
    pub http: Option<reqwest::Client>,
}

impl FederationConfig {
    #[must_use]
    pub fn new(settings: FederationSettings, store: Arc<dyn UserStore>) -> Self {
        Self {
            settings,
            store,
            http: None,
        }
    }
}

impl FederationState {
    /// Wire the services together. Fails when the configured key is not
    /// 32 bytes or the session lifetime is out of range.
    pub fn new(config: &FederationConfig) -> FederationResult<Self> {
        let settings = &config.settings;
        let http = config.http.clone().unwrap_or_default();

        let vault = TokenVault::new(settings.auth_key.as_bytes())?;
        let discovery = DiscoveryService::new(http.clone(), settings.api_base_url.clone());
        let auth_flow = AuthFlowService::new(
            http,
            discovery.clone(),
            settings.enabled,
            settings.client_secret.clone(),
            Duration::from_secs(settings.exchange_timeout_secs),
        );
        let provisioning = ProvisioningService::new(
            Arc::clone(&config.store),
            vault,
            settings.create_user,
            settings.user_defaults,
        );
        let sessions = SessionIssuer::with_hours(
            settings.auth_key.as_bytes(),
            settings.token_expiration_hours,
        )?;

        Ok(Self {
            base_path: settings.normalized_base_path(),
            settings: Arc::new(settings.clone()),
            discovery,
            auth_flow,
            provisioning,
            sessions,
        })
    }
}

/// Create the public login routes.
///
/// Routes:
/// - GET /login - Redirect to the provider
/// - GET /callback - Handle the provider's response
/// - GET /logout - Clear the session and redirect to the provider's logout
pub fn auth_routes() -> Router<FederationState> {
    Router::new()
        .route("/login", get(federation::login))
        .route("/callback", get(federation::callback))
        .route("/logout", get(federation::logout))
}

/// Create the bridge router, nested under `{base_path}api/auth/b2c`.
pub fn create_federation_router(config: FederationConfig) -> FederationResult<Router> {
    let state = FederationState::new(&config)?;
    let prefix = format!("{}api/auth/b2c", state.base_path);

    tracing::info!(
        prefix = %prefix,
        enabled = state.settings.enabled,
        create_user = state.settings.create_user,
        "B2C login routes configured"
    );

    Ok(Router::new()
        .nest(&prefix, auth_routes())
        .with_state(state))
}
