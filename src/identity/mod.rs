//! Accounts, password hashing and session tokens

pub mod directory;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use directory::UserDirectory;
pub use error::AuthError;
pub use password::{Argon2PasswordHasher, MIN_PASSWORD_LEN, PasswordHasher};
pub use service::{
    AccountSummary, AuthTokenService, Credential, DEFAULT_ROLE, LoginResponse, Registration,
};
pub use token::{Claims, IssuedToken, SigningSecret, TOKEN_LIFETIME, TokenIssuer};
