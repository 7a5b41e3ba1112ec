//! Shared application state

use crate::core::entity::Entity;
use crate::core::store::{Database, EntityStore};
use crate::identity::{
    Argon2PasswordHasher, AuthTokenService, PasswordHasher, SigningSecret, TokenIssuer,
};
use std::sync::Arc;

/// State cloned into every handler.
///
/// Stores are built per request so their change trackers never outlive it.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<dyn Database>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(database: Arc<dyn Database>, secret: &SigningSecret) -> Self {
        Self::with_hasher(database, Arc::new(Argon2PasswordHasher::new()), secret)
    }

    pub fn with_hasher(
        database: Arc<dyn Database>,
        hasher: Arc<dyn PasswordHasher>,
        secret: &SigningSecret,
    ) -> Self {
        Self {
            database,
            hasher,
            tokens: TokenIssuer::new(secret),
        }
    }

    /// A fresh store for one request
    pub fn store<T: Entity>(&self) -> EntityStore<T> {
        EntityStore::new(self.database.clone())
    }

    pub fn auth_service(&self) -> AuthTokenService {
        AuthTokenService::new(self.database.clone(), self.hasher.clone(), self.tokens.clone())
    }
}
