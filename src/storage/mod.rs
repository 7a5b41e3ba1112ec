//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryDatabase;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresDatabase, ensure_schema};

use crate::config::{BackendKind, DatabaseConfig};
use crate::core::store::Database;
use anyhow::Result;
use std::sync::Arc;

/// Open the backend selected by `config`.
///
/// For Postgres the schema for every domain table is created if missing.
pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn Database>> {
    match config.backend {
        BackendKind::InMemory => Ok(Arc::new(InMemoryDatabase::new())),
        BackendKind::Postgres => open_postgres(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &DatabaseConfig) -> Result<Arc<dyn Database>> {
    use crate::core::entity::Entity;
    use crate::entities::{Account, Villa, VillaNumber};
    use anyhow::Context;

    let url = config
        .url
        .as_deref()
        .context("database.url is required for the postgres backend")?;
    let db = PostgresDatabase::connect(url, config.max_connections).await?;
    ensure_schema(
        db.pool(),
        &[Villa::schema(), VillaNumber::schema(), Account::schema()],
    )
    .await?;

    tracing::info!(max_connections = config.max_connections, "Connected to Postgres");
    Ok(Arc::new(db))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_config: &DatabaseConfig) -> Result<Arc<dyn Database>> {
    anyhow::bail!("postgres backend requested but the `postgres` feature is disabled")
}
