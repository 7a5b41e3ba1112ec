//! Core module containing fundamental traits and types for the framework

pub mod auth;
pub mod entity;
pub mod error;
pub mod field;
pub mod filter;
pub mod query;
pub mod store;
pub mod tracking;

pub use auth::{AuthContext, AuthPolicy};
pub use entity::{Entity, Navigation, TableSchema};
pub use error::{ErrorResponse, NotFoundError, PersistenceError, StoreError, ValidationError};
pub use field::FieldValue;
pub use filter::{CompareOp, Filter};
pub use query::{IncludeSpec, MAX_PAGE_SIZE, Page};
pub use store::{Database, EntityStore, RowQuery, StoreResult};
pub use tracking::{ChangeTracker, TrackingMode};
