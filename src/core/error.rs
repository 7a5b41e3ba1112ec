//! Typed error handling for the entity store
//!
//! Store operations fail with a [`StoreError`], split into three categories
//! so callers can react to each without string matching:
//!
//! - [`NotFoundError`]: the identity is absent at get/update/remove time
//! - [`ValidationError`]: the request was malformed before reaching storage
//!   (bad filter, unknown include, invalid page, untracked save)
//! - [`PersistenceError`]: the backend rejected the commit or failed
//!
//! # Example
//!
//! ```rust,ignore
//! match store.remove(&villa).await {
//!     Ok(()) => {}
//!     Err(StoreError::NotFound(e)) => println!("{} is already gone", e.id),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The error type returned by every `EntityStore` and `Database` operation
#[derive(Debug)]
pub enum StoreError {
    /// Identity absent at get/update/remove time
    NotFound(NotFoundError),

    /// Malformed request detected locally
    Validation(ValidationError),

    /// Store-level constraint violation or backend failure
    Persistence(PersistenceError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(e) => write!(f, "{}", e),
            StoreError::Validation(e) => write!(f, "{}", e),
            StoreError::Persistence(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::NotFound(e) => Some(e),
            StoreError::Validation(e) => Some(e),
            StoreError::Persistence(e) => Some(e),
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl StoreError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::Persistence(e) => e.status_code(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "ENTITY_NOT_FOUND",
            StoreError::Validation(e) => e.error_code(),
            StoreError::Persistence(e) => e.error_code(),
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }

    /// Shorthand used by backends when an identity is missing
    pub fn not_found(entity_type: impl Into<String>, id: i64) -> Self {
        StoreError::NotFound(NotFoundError {
            entity_type: entity_type.into(),
            id,
        })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Not Found
// =============================================================================

/// An identity that no longer exists server-side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundError {
    pub entity_type: String,
    pub id: i64,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with id '{}' not found", self.entity_type, self.id)
    }
}

impl std::error::Error for NotFoundError {}

impl From<NotFoundError> for StoreError {
    fn from(err: NotFoundError) -> Self {
        StoreError::NotFound(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors detected locally, before any store round-trip
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A filter references a field the entity does not have
    UnknownField { entity_type: String, field: String },

    /// A filter is structurally invalid
    InvalidFilter { message: String },

    /// An include names a navigation the entity does not have
    UnknownInclude {
        entity_type: String,
        include: String,
    },

    /// Page number below 1
    InvalidPage { number: usize },

    /// `save` was called for an entity this store is not tracking
    NotTracked { entity_type: String, id: i64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownField { entity_type, field } => {
                write!(f, "Unknown field '{}' on {}", field, entity_type)
            }
            ValidationError::InvalidFilter { message } => {
                write!(f, "Invalid filter: {}", message)
            }
            ValidationError::UnknownInclude {
                entity_type,
                include,
            } => {
                write!(f, "Unknown include '{}' on {}", include, entity_type)
            }
            ValidationError::InvalidPage { number } => {
                write!(f, "Invalid page number {}: pages start at 1", number)
            }
            ValidationError::NotTracked { entity_type, id } => {
                write!(f, "{} with id '{}' is not tracked by this store", entity_type, id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::UnknownField { .. } => "UNKNOWN_FIELD",
            ValidationError::InvalidFilter { .. } => "INVALID_FILTER",
            ValidationError::UnknownInclude { .. } => "UNKNOWN_INCLUDE",
            ValidationError::InvalidPage { .. } => "INVALID_PAGE",
            ValidationError::NotTracked { .. } => "ENTITY_NOT_TRACKED",
        }
    }

    pub(crate) fn invalid_filter(message: impl Into<String>) -> Self {
        ValidationError::InvalidFilter {
            message: message.into(),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}

// =============================================================================
// Persistence Errors
// =============================================================================

/// Errors raised by the storage backend
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// A unique or referential constraint was violated at commit time
    ConstraintViolation { table: String, message: String },

    /// Connectivity or query execution failure
    Backend { backend: String, message: String },

    /// A row could not be converted to or from its entity type
    Serialization {
        entity_type: String,
        message: String,
    },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::ConstraintViolation { table, message } => {
                write!(f, "Constraint violated on '{}': {}", table, message)
            }
            PersistenceError::Backend { backend, message } => {
                write!(f, "{} error: {}", backend, message)
            }
            PersistenceError::Serialization {
                entity_type,
                message,
            } => {
                write!(
                    f,
                    "Failed to serialize/deserialize {}: {}",
                    entity_type, message
                )
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

impl PersistenceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PersistenceError::ConstraintViolation { .. } => StatusCode::CONFLICT,
            PersistenceError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PersistenceError::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PersistenceError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            PersistenceError::Backend { .. } => "STORAGE_ERROR",
            PersistenceError::Serialization { .. } => "ENTITY_SERIALIZATION_ERROR",
        }
    }

    pub(crate) fn backend(backend: &str, message: impl fmt::Display) -> Self {
        PersistenceError::Backend {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn constraint(table: &str, message: impl Into<String>) -> Self {
        PersistenceError::ConstraintViolation {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        StoreError::Persistence(err)
    }
}
