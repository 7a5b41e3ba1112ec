//! Account persistence for the identity layer

use crate::core::entity::Entity;
use crate::core::filter::Filter;
use crate::core::query::IncludeSpec;
use crate::core::store::{Database, EntityStore};
use crate::core::tracking::TrackingMode;
use crate::entities::Account;
use crate::identity::error::AuthError;
use crate::identity::password::PasswordHasher;
use std::sync::Arc;
use tracing::{debug, info};

/// Thin adapter over `EntityStore<Account>`.
///
/// Username uniqueness is a read-then-write pre-check, not a storage
/// constraint: two concurrent `create` calls for the same name can both
/// succeed.
pub struct UserDirectory {
    accounts: EntityStore<Account>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserDirectory {
    pub fn new(db: Arc<dyn Database>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            accounts: EntityStore::new(db),
            hasher,
        }
    }

    /// Case-insensitive lookup, detached from change tracking
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AuthError> {
        let filter = Filter::eq_ignore_case("username", username);
        Ok(self
            .accounts
            .get(Some(&filter), TrackingMode::Detached, &IncludeSpec::none())
            .await?)
    }

    /// Exact, case-sensitive existence check
    pub async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let filter = Filter::eq("username", username);
        Ok(self
            .accounts
            .get(Some(&filter), TrackingMode::Detached, &IncludeSpec::none())
            .await?
            .is_some())
    }

    /// Hash `password` and persist the account.
    ///
    /// Any `password_hash` already set on `account` is replaced.
    pub async fn create(&self, mut account: Account, password: &str) -> Result<Account, AuthError> {
        if self.find_by_username(&account.username).await?.is_some() {
            return Err(AuthError::DuplicateUsername(account.username));
        }

        account.password_hash = self.hasher.hash(password).await?;
        let account = self.accounts.create(account).await?;

        info!(account_id = account.id, username = %account.username, "Account created");
        Ok(account)
    }

    /// Add a role to an account; already-held roles are left as they are
    pub async fn assign_role(&self, account_id: i64, role: &str) -> Result<Account, AuthError> {
        let mut account = self
            .accounts
            .get_by_id(account_id, TrackingMode::Tracked, &IncludeSpec::none())
            .await?;

        account.roles.insert(role.to_string());
        let written = self.accounts.save(&account).await?;

        debug!(
            table = Account::table(),
            account_id,
            role,
            written,
            "Role assigned"
        );
        Ok(account)
    }

    pub async fn verify_password(
        &self,
        account: &Account,
        password: &str,
    ) -> Result<bool, AuthError> {
        self.hasher.verify(password, &account.password_hash).await
    }
}
