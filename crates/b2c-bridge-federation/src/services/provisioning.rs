//! User provisioning: create-or-update of the local user after a successful
//! provider login.

use std::sync::Arc;

use tracing::instrument;

use crate::error::{FederationError, FederationResult};
use crate::models::{LoginMethod, Permissions, ProvisionedUser, UserField};
use crate::services::store::{StoreError, UserStore};
use crate::services::TokenVault;

/// Everything the callback learned about the user.
#[derive(Debug, Clone)]
pub struct ProvisionInput {
    pub username: String,
    pub is_admin: bool,
    pub access_token: String,
    pub refresh_token: String,
    /// Provider token expiry as epoch seconds.
    pub expires_at: i64,
}

/// Decrypted provider tokens of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// User provisioning service.
#[derive(Clone)]
pub struct ProvisioningService {
    store: Arc<dyn UserStore>,
    vault: TokenVault,
    create_user: bool,
    user_defaults: Permissions,
}

impl ProvisioningService {
    #[must_use]
    pub fn new(
        store: Arc<dyn UserStore>,
        vault: TokenVault,
        create_user: bool,
        user_defaults: Permissions,
    ) -> Self {
        Self {
            store,
            vault,
            create_user,
            user_defaults,
        }
    }

    /// Create or update the local user for `input.username`.
    ///
    /// The admin flag is only ever raised here. A login without the admin
    /// claim leaves an existing admin untouched.
    #[instrument(skip(self, input), fields(username = %input.username, is_admin = input.is_admin))]
    pub async fn provision(&self, input: &ProvisionInput) -> FederationResult<ProvisionedUser> {
        if let Some(existing) = self.store.get(&input.username).await? {
            return self.sync_existing(existing, input).await;
        }

        if !self.create_user {
            tracing::error!(
                username = %input.username,
                "User does not exist and auto-creation is disabled"
            );
            return Err(FederationError::UserNotFound(input.username.clone()));
        }

        if let Some(created) = self.create_new(input).await? {
            return Ok(created);
        }

        // Another login created the user between our get and create.
        tracing::info!(username = %input.username, "User created concurrently, updating instead");
        let existing = self.store.get(&input.username).await?.ok_or_else(|| {
            FederationError::PersistenceFailed(format!(
                "user {} vanished after a create conflict",
                input.username
            ))
        })?;
        self.sync_existing(existing, input).await
    }

    /// `Ok(None)` when the username was taken concurrently.
    async fn create_new(
        &self,
        input: &ProvisionInput,
    ) -> FederationResult<Option<ProvisionedUser>> {
        tracing::info!(username = %input.username, "Creating new B2C user");

        let mut permissions = self.user_defaults;
        if input.is_admin {
            permissions.admin = true;
        }

        let user = ProvisionedUser {
            id: 0,
            username: input.username.clone(),
            permissions,
            login_method: LoginMethod::B2c,
            provider_access_token: self.vault.encrypt(&input.access_token)?,
            provider_refresh_token: self.vault.encrypt(&input.refresh_token)?,
            provider_token_expiry: input.expires_at,
        };

        match self.store.create(user).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        // Re-read to pick up the store-assigned id.
        let created = self.store.get(&input.username).await?.ok_or_else(|| {
            FederationError::PersistenceFailed(format!(
                "created user {} could not be reloaded",
                input.username
            ))
        })?;
        Ok(Some(created))
    }

    async fn sync_existing(
        &self,
        mut user: ProvisionedUser,
        input: &ProvisionInput,
    ) -> FederationResult<ProvisionedUser> {
        tracing::info!(username = %user.username, user_id = user.id, "Updating existing B2C user");

        user.provider_access_token = self.vault.encrypt(&input.access_token)?;
        user.provider_refresh_token = self.vault.encrypt(&input.refresh_token)?;
        user.provider_token_expiry = input.expires_at;
        user.login_method = LoginMethod::B2c;
        if input.is_admin {
            user.permissions.admin = true;
        }

        self.store.update(&user, &UserField::LOGIN_SYNC).await?;
        Ok(user)
    }

    /// Decrypt the stored provider tokens of a user.
    ///
    /// `Ok(None)` when the user exists but did not log in through B2C.
    #[instrument(skip(self))]
    pub async fn provider_tokens(&self, username: &str) -> FederationResult<Option<ProviderTokens>> {
        let user = self
            .store
            .get(username)
            .await?
            .ok_or_else(|| FederationError::UserNotFound(username.to_string()))?;

        if user.login_method != LoginMethod::B2c {
            return Ok(None);
        }

        Ok(Some(ProviderTokens {
            access_token: self.vault.decrypt(&user.provider_access_token)?,
            refresh_token: self.vault.decrypt(&user.provider_refresh_token)?,
            expires_at: user.provider_token_expiry,
        }))
    }
}
