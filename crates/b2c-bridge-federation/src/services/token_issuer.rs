//! Session issuer: mints the application's own session token once the
//! federated user has been provisioned.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{FederationError, FederationResult};
use crate::models::{Permissions, ProvisionedUser};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Durable id of the local user.
    pub belongs_to: u64,
    pub permissions: Permissions,
    /// Issued at as Unix timestamp.
    pub iat: i64,
    /// Expiration time as Unix timestamp.
    pub exp: i64,
}

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: i64,
}

/// HS256 session token issuer.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    /// Create an issuer signing with `secret`; tokens live for `ttl`.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Create an issuer whose tokens live for `hours`.
    pub fn with_hours(secret: &[u8], hours: i64) -> FederationResult<Self> {
        let ttl =
            Duration::try_hours(hours).ok_or(FederationError::InvalidSessionLifetime(hours))?;
        Ok(Self::new(secret, ttl))
    }

    /// Issue a session token for a persisted user.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub fn issue(&self, user: &ProvisionedUser) -> FederationResult<IssuedSession> {
        let now = Utc::now();
        let expires = now.checked_add_signed(self.ttl).ok_or_else(|| {
            FederationError::SigningFailed("session expiry out of range".to_string())
        })?;
        let claims = SessionClaims {
            belongs_to: user.id,
            permissions: user.permissions,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| FederationError::SigningFailed(e.to_string()))?;

        info!(
            user_id = user.id,
            admin = claims.permissions.admin,
            expires_at = claims.exp,
            "Issued session token"
        );

        Ok(IssuedSession {
            token,
            expires_at: claims.exp,
        })
    }

    /// Validate a session token and return its claims.
    pub fn verify(&self, token: &str) -> FederationResult<SessionClaims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| FederationError::InvalidSession(e.to_string()))
    }
}
