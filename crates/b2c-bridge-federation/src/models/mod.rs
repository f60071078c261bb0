//! Data types for the B2C bridge.

pub mod flow_state;
pub mod requests;
pub mod user;

pub use flow_state::{FlowState, NONCE_LEN};
pub use requests::{CallbackParams, LoginParams};
pub use user::{LoginMethod, Permissions, ProvisionedUser, UserField};

/// Identity claims decoded from the provider's ID token.
pub type IdentityClaims = serde_json::Map<String, serde_json::Value>;
