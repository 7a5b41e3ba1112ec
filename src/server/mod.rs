//! HTTP surface built on axum
//!
//! Handlers translate requests into `EntityStore` and `AuthTokenService`
//! calls and shape the results into DTOs. Stores are created per request
//! from the shared [`AppState`].

pub mod builder;
pub mod extract;
pub mod patch;
pub mod response;
pub mod router;
pub mod state;
pub mod users;
pub mod villa;
pub mod villa_number;

pub use builder::ServerBuilder;
pub use extract::{Validated, require};
pub use patch::{PatchError, PatchOperation, apply_patch};
pub use response::{ApiError, ApiResponse};
pub use router::build_router;
pub use state::AppState;
