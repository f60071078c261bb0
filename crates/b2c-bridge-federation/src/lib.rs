//! Azure AD B2C login bridge.
//!
//! Lets an application delegate sign-in to an Azure AD B2C tenant reached
//! through an intermediary discovery API, then issues the application's own
//! session for the authenticated user.
//!
//! # Flow
//!
//! 1. `GET /login` discovers the tenant's login URL, forces the code flow and
//!    redirects the browser there with a `nonce:redirect` state.
//! 2. `GET /callback` exchanges the code, reads the ID token claims, creates
//!    or updates the local user (provider tokens encrypted at rest) and sets
//!    a signed session cookie.
//! 3. `GET /logout` clears the cookie and redirects to the tenant's logout URL.
//!
//! The ID token signature is not verified against the provider's keys, and
//! the state nonce is not checked against a server-side record.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use b2c_bridge_federation::{create_federation_router, FederationConfig, InMemoryUserStore};
//!
//! let router = create_federation_router(FederationConfig::new(
//!     settings,
//!     Arc::new(InMemoryUserStore::new()),
//! ))?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use config::FederationSettings;
pub use error::{ErrorResponse, FederationError, FederationResult};
pub use handlers::cookie::SESSION_COOKIE_NAME;
pub use models::{LoginMethod, Permissions, ProvisionedUser, UserField};
pub use router::{auth_routes, create_federation_router, FederationConfig, FederationState};
pub use services::{
    InMemoryUserStore, ProviderTokens, SessionClaims, SessionIssuer, StoreError, StoreResult,
    TokenVault, UserStore,
};
