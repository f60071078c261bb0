//! User store interface and an in-memory implementation.
//!
//! The durable store belongs to the embedding application. The bridge only
//! needs get/create/update keyed by username; consistency between concurrent
//! writers is the store's responsibility.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{ProvisionedUser, UserField};

/// User store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User already exists: {0}")]
    Conflict(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent user store keyed by username.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user. `Ok(None)` when the username is unknown.
    async fn get(&self, username: &str) -> StoreResult<Option<ProvisionedUser>>;

    /// Persist a new user. Fails with [`StoreError::Conflict`] when the
    /// username is taken. The store assigns the durable id.
    async fn create(&self, user: ProvisionedUser) -> StoreResult<()>;

    /// Overwrite the listed fields of an existing user.
    async fn update(&self, user: &ProvisionedUser, fields: &[UserField]) -> StoreResult<()>;
}

/// In-memory [`UserStore`], for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, ProvisionedUser>>,
    next_id: AtomicU64,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, username: &str) -> StoreResult<Option<ProvisionedUser>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create(&self, mut user: ProvisionedUser) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(StoreError::Conflict(user.username));
        }
        user.id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn update(&self, user: &ProvisionedUser, fields: &[UserField]) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user.username)
            .ok_or_else(|| StoreError::NotFound(user.username.clone()))?;

        for field in fields {
            match field {
                UserField::ProviderAccessToken => {
                    stored.provider_access_token = user.provider_access_token.clone();
                }
                UserField::ProviderRefreshToken => {
                    stored.provider_refresh_token = user.provider_refresh_token.clone();
                }
                UserField::ProviderTokenExpiry => {
                    stored.provider_token_expiry = user.provider_token_expiry;
                }
                UserField::LoginMethod => stored.login_method = user.login_method,
                UserField::Permissions => stored.permissions = user.permissions,
            }
        }
        Ok(())
    }
}
