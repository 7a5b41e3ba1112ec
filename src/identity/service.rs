//! Login and registration

use crate::core::store::Database;
use crate::entities::Account;
use crate::identity::directory::UserDirectory;
use crate::identity::error::AuthError;
use crate::identity::password::PasswordHasher;
use crate::identity::token::{IssuedToken, TokenIssuer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Role granted to every registered account
pub const DEFAULT_ROLE: &str = "admin";

/// Username and plaintext password, never persisted
#[derive(Clone, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: i64,
    pub username: String,
    pub name: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            name: account.name.clone(),
        }
    }
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: IssuedToken,
    pub user: AccountSummary,
    pub role: Option<String>,
}

/// Credential checks and token issuance.
///
/// Built per request around a shared database, hasher and issuer. The
/// signing key lives in the [`TokenIssuer`], injected at construction.
pub struct AuthTokenService {
    directory: UserDirectory,
    tokens: TokenIssuer,
}

impl AuthTokenService {
    pub fn new(
        db: Arc<dyn Database>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            directory: UserDirectory::new(db, hasher),
            tokens,
        }
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    /// Authenticate and issue a token.
    ///
    /// Unknown usernames and wrong passwords both yield `Ok(None)`. Only the
    /// first assigned role is put into the token.
    pub async fn login(&self, credential: &Credential) -> Result<Option<LoginResponse>, AuthError> {
        let Some(account) = self.directory.find_by_username(&credential.username).await? else {
            debug!("Login rejected");
            return Ok(None);
        };

        if !self
            .directory
            .verify_password(&account, &credential.password)
            .await?
        {
            debug!("Login rejected");
            return Ok(None);
        }

        let role = account.primary_role().map(str::to_string);
        let token = self.tokens.issue(account.id, role.as_deref())?;

        info!(account_id = account.id, "Login succeeded");
        Ok(Some(LoginResponse {
            token,
            user: AccountSummary::from(&account),
            role,
        }))
    }

    /// Create an account and grant it [`DEFAULT_ROLE`]
    pub async fn register(&self, registration: &Registration) -> Result<AccountSummary, AuthError> {
        let account = Account {
            username: registration.username.clone(),
            email: registration.username.clone(),
            normalized_email: registration.username.to_uppercase(),
            name: registration.name.clone(),
            ..Default::default()
        };

        let account = self
            .directory
            .create(account, &registration.password)
            .await?;
        let account = self.directory.assign_role(account.id, DEFAULT_ROLE).await?;

        info!(account_id = account.id, "Account registered");
        Ok(AccountSummary::from(&account))
    }

    /// Exact, case-sensitive check; login lookups ignore case
    pub async fn is_unique(&self, username: &str) -> Result<bool, AuthError> {
        Ok(!self.directory.username_exists(username).await?)
    }
}
