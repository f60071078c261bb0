//! Error types for the B2C login bridge.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

/// Federation error types.
#[derive(Debug, Error)]
pub enum FederationError {
    // Configuration errors
    #[error("B2C authentication is not enabled")]
    Disabled,

    #[error("Session lifetime of {0} hours is out of range")]
    InvalidSessionLifetime(i64),

    // Discovery errors
    #[error("Discovery API unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Discovery API returned status {0}")]
    UpstreamBadStatus(u16),

    #[error("Discovery API returned an unreadable body: {0}")]
    UpstreamMalformed(String),

    #[error("Failed to parse provider URL: {0}")]
    MalformedRedirect(String),

    // Callback errors
    #[error("Token exchange failed: {0}")]
    CodeExchangeFailed(String),

    #[error("No ID token received from provider")]
    NoIdentityAssertion,

    #[error("Invalid ID token: {0}")]
    InvalidIdToken(String),

    #[error("No valid username found in ID token claims")]
    NoUsernameClaim,

    #[error("Provider returned error: {error} - {description}")]
    IdpError { error: String, description: String },

    // Provisioning errors
    #[error("User does not exist: {0}")]
    UserNotFound(String),

    // Token vault errors
    #[error("Invalid encryption key length: must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Ciphertext too short")]
    CiphertextTruncated,

    #[error("Ciphertext failed authentication")]
    AuthenticationFailed,

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    // Infrastructure errors
    #[error("User store operation failed: {0}")]
    PersistenceFailed(String),

    #[error("Failed to sign session token: {0}")]
    SigningFailed(String),

    #[error("Invalid session token: {0}")]
    InvalidSession(String),
}

impl FederationError {
    /// HTTP status this error is surfaced as.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            FederationError::Disabled | FederationError::UserNotFound(_) => StatusCode::FORBIDDEN,
            FederationError::IdpError { .. } => StatusCode::BAD_REQUEST,
            FederationError::InvalidSession(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for FederationError {
    fn into_response(self) -> Response {
        let (error_code, message) = match &self {
            // 403 Forbidden
            FederationError::Disabled => (
                "b2c_disabled",
                "B2C authentication is not enabled",
            ),
            FederationError::UserNotFound(username) => {
                tracing::warn!(username = %username, "Login refused: user does not exist");
                ("user_not_found", "User does not exist")
            }

            // 400 Bad Request
            FederationError::IdpError { error, description } => {
                // Use Debug format (?), not Display (%), so provider-controlled text cannot inject log lines.
                tracing::warn!(
                    idp_error = ?error,
                    idp_description = ?description,
                    "Provider returned error (not reflected to client)"
                );
                ("idp_error", "The identity provider returned an error")
            }

            // 401 Unauthorized
            FederationError::InvalidSession(msg) => {
                tracing::debug!("Session token rejected: {}", msg);
                ("invalid_session", "Session is invalid or expired")
            }

            // 500 Internal Server Error
            FederationError::UpstreamUnreachable(msg)
            | FederationError::UpstreamMalformed(msg) => {
                tracing::error!("Discovery error: {}", msg);
                (
                    "discovery_failed",
                    "Failed to fetch login URL from identity provider",
                )
            }
            FederationError::UpstreamBadStatus(status) => {
                tracing::error!(status = %status, "Discovery API returned non-success status");
                (
                    "discovery_failed",
                    "Failed to fetch login URL from identity provider",
                )
            }
            FederationError::MalformedRedirect(msg) => {
                tracing::error!("Provider URL parse error: {}", msg);
                ("invalid_provider_url", "Failed to parse login URL")
            }
            FederationError::CodeExchangeFailed(msg) => {
                tracing::error!("Token exchange failed: {}", msg);
                (
                    "token_exchange_failed",
                    "Token exchange with identity provider failed",
                )
            }
            FederationError::NoIdentityAssertion => {
                tracing::error!("No ID token in token response");
                ("no_id_token", "No ID token received")
            }
            FederationError::InvalidIdToken(msg) => {
                tracing::error!("ID token decode error: {}", msg);
                ("invalid_id_token", "Failed to parse ID token")
            }
            FederationError::NoUsernameClaim => {
                tracing::error!("No valid username found in ID token claims");
                ("no_username", "No valid username found")
            }
            FederationError::InvalidKeyLength(_)
            | FederationError::EncryptionFailed(_)
            | FederationError::CiphertextTruncated
            | FederationError::AuthenticationFailed
            | FederationError::DecryptionFailed(_) => {
                tracing::error!("Token vault error: {}", self);
                ("encryption_error", "Security operation failed")
            }
            FederationError::PersistenceFailed(msg) => {
                tracing::error!("User store error: {}", msg);
                ("persistence_error", "Failed to save user")
            }
            FederationError::InvalidSessionLifetime(hours) => {
                tracing::error!(hours = %hours, "Session lifetime out of range");
                ("session_error", "Failed to issue session")
            }
            FederationError::SigningFailed(msg) => {
                tracing::error!("Session signing error: {}", msg);
                ("session_error", "Failed to issue session")
            }
        };

        let body = ErrorResponse {
            error: error_code.to_string(),
            message: message.to_string(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<crate::services::store::StoreError> for FederationError {
    fn from(err: crate::services::store::StoreError) -> Self {
        FederationError::PersistenceFailed(err.to_string())
    }
}
