use crate::core::error::StoreError;
use axum::http::StatusCode;

/// Errors raised by the identity layer.
///
/// A credential mismatch is not an error: `AuthTokenService::login`
/// reports it as `Ok(None)` so callers cannot tell which half was wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Store(e) => e.status_code(),
            AuthError::Hashing(_) | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InvalidToken(_) | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::WeakPassword { .. } | AuthError::DuplicateUsername(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Store(e) => e.error_code(),
            AuthError::Hashing(_) => "HASHING_FAILED",
            AuthError::Signing(_) => "SIGNING_FAILED",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::WeakPassword { .. } => "WEAK_PASSWORD",
            AuthError::DuplicateUsername(_) => "DUPLICATE_USERNAME",
        }
    }
}
