//! Services for the B2C login bridge.

pub mod auth_flow;
pub mod claims;
pub mod discovery;
pub mod encryption;
pub mod provisioning;
pub mod store;
pub mod token_issuer;

pub use auth_flow::{AuthFlowService, TokenResponse};
pub use discovery::{DiscoveryKind, DiscoveryService, ProviderEndpoints};
pub use encryption::TokenVault;
pub use provisioning::{ProviderTokens, ProvisionInput, ProvisioningService};
pub use store::{InMemoryUserStore, StoreError, StoreResult, UserStore};
pub use token_issuer::{IssuedSession, SessionClaims, SessionIssuer};
