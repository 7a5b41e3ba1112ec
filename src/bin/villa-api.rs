//! Villa inventory API server
//!
//! Reads the YAML file named by `VILLA_CONFIG` (optional), applies
//! `VILLA_API_SECRET` / `VILLA_DATABASE_URL`, and serves until Ctrl+C.

use anyhow::Result;
use villa::config::{AppConfig, init_tracing};
use villa::server::ServerBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    tracing::info!(
        backend = ?config.database.backend,
        seed = config.seed_demo_data,
        "Starting villa-api"
    );

    ServerBuilder::new(config).serve().await
}
