//! # Villa Inventory
//!
//! Backend for a rental-property catalogue: villas, numbered villa units
//! and the accounts that manage them.
//!
//! ## Features
//!
//! - **Generic entity store**: `EntityStore<T>` composes filter, eager-load
//!   and pagination into one bounded query over any [`Database`](core::Database)
//! - **Explicit tracking**: entities are read `Tracked` or `Detached`, and
//!   nothing is written back without an explicit `update` or `save`
//! - **Pluggable storage**: in-memory (default) and Postgres (`postgres` feature)
//! - **Token authentication**: argon2 password hashes and short-lived HS256 JWTs
//! - **REST API**: axum handlers with a uniform response envelope
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use villa::prelude::*;
//!
//! impl_entity!(
//!     Room,
//!     "rooms",
//!     {
//!         label: String,
//!         beds: i64,
//!     }
//! );
//!
//! let store = EntityStore::<Room>::new(Arc::new(InMemoryDatabase::new()));
//! let room = store.create(Room { label: "A".into(), beds: 2, ..Default::default() }).await?;
//!
//! let page = store
//!     .get_all(Some(&Filter::gte("beds", 2i64)), &IncludeSpec::none(), Page::new(10, 1))
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod identity;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AuthContext, AuthPolicy, CompareOp, Database, Entity, EntityStore, FieldValue, Filter,
        IncludeSpec, MAX_PAGE_SIZE, Navigation, Page, PersistenceError, StoreError, StoreResult,
        TableSchema, TrackingMode, ValidationError,
    };

    // === Macros ===
    pub use crate::impl_entity;

    // === Entities ===
    pub use crate::entities::{Account, Villa, VillaNumber};

    // === Identity ===
    pub use crate::identity::{
        Argon2PasswordHasher, AuthError, AuthTokenService, Credential, PasswordHasher,
        Registration, SigningSecret, TokenIssuer, UserDirectory,
    };

    // === Storage ===
    pub use crate::storage::InMemoryDatabase;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresDatabase;

    // === Config ===
    pub use crate::config::{AppConfig, init_tracing};

    // === Server ===
    pub use crate::server::{ApiError, ApiResponse, AppState, ServerBuilder, build_router};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
