//! Discovery client for the intermediary API that publishes the provider's
//! current login and logout URLs.

use std::fmt;
use std::time::Duration;

use tracing::instrument;

use crate::error::{FederationError, FederationResult};

/// Timeout applied to every discovery request.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Which entry URL to discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    Login,
    Logout,
}

impl DiscoveryKind {
    fn path(self) -> &'static str {
        match self {
            DiscoveryKind::Login => "/api/NansenFile/LoginURL",
            DiscoveryKind::Logout => "/api/NansenFile/LogoutURL",
        }
    }
}

impl fmt::Display for DiscoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryKind::Login => write!(f, "login"),
            DiscoveryKind::Logout => write!(f, "logout"),
        }
    }
}

/// Provider endpoints derived from a discovered login URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Inferred: B2C serves `/token` next to `/authorize`.
    pub token_url: String,
    pub client_id: String,
}

impl ProviderEndpoints {
    /// Derive endpoints from the provider login URL.
    ///
    /// The token URL is the login URL with the first `/authorize` replaced by
    /// `/token` and the query string dropped.
    pub fn from_login_url(login_url: &str) -> FederationResult<Self> {
        let parsed = url::Url::parse(login_url)
            .map_err(|e| FederationError::MalformedRedirect(e.to_string()))?;

        let client_id = parsed
            .query_pairs()
            .find(|(k, _)| k == "client_id")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        if client_id.is_empty() {
            tracing::warn!("Provider login URL carries no client_id");
        }

        let replaced = login_url.replacen("/authorize", "/token", 1);
        let token_url = match replaced.split_once('?') {
            Some((base, _)) => base.to_string(),
            None => replaced,
        };

        Ok(Self {
            token_url,
            client_id,
        })
    }
}

/// Discovery service.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    http: reqwest::Client,
    api_base_url: String,
}

impl DiscoveryService {
    /// Create a discovery service for the given API base URL.
    #[must_use]
    pub fn new(http: reqwest::Client, api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self { http, api_base_url }
    }

    /// Fetch the provider login URL.
    pub async fn login_url(&self) -> FederationResult<String> {
        self.fetch(DiscoveryKind::Login).await
    }

    /// Fetch the provider logout URL.
    pub async fn logout_url(&self) -> FederationResult<String> {
        self.fetch(DiscoveryKind::Logout).await
    }

    /// Fetch one entry URL. A single attempt; the caller decides on retries.
    #[instrument(skip(self), fields(api = %self.api_base_url))]
    pub async fn fetch(&self, kind: DiscoveryKind) -> FederationResult<String> {
        let endpoint = format!("{}{}", self.api_base_url, kind.path());

        let response = self
            .http
            .get(&endpoint)
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await
            .map_err(|e| FederationError::UpstreamUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                status = %status,
                kind = %kind,
                "Discovery API returned non-success status"
            );
            return Err(FederationError::UpstreamBadStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FederationError::UpstreamMalformed(e.to_string()))?;

        let url = body.trim();
        if url.is_empty() {
            return Err(FederationError::UpstreamMalformed(format!(
                "empty {kind} URL"
            )));
        }

        tracing::debug!(kind = %kind, "Fetched provider URL");
        Ok(url.to_string())
    }
}
