//! ServerBuilder: assembles state from configuration and serves the API

use super::router::build_router;
use super::state::AppState;
use crate::config::AppConfig;
use crate::core::query::{IncludeSpec, Page};
use crate::core::store::{Database, EntityStore};
use crate::entities::{Villa, seed_villas};
use crate::identity::PasswordHasher;
use crate::storage;
use anyhow::Result;
use axum::Router;
use chrono::Utc;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the HTTP server
///
/// # Example
///
/// ```ignore
/// let config = AppConfig::load()?;
/// ServerBuilder::new(config).serve().await?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    database: Option<Arc<dyn Database>>,
    hasher: Option<Arc<dyn PasswordHasher>>,
}

impl ServerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            database: None,
            hasher: None,
        }
    }

    /// Use an already opened backend instead of the configured one
    pub fn with_database(mut self, database: Arc<dyn Database>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Open the backend, seed it if configured, and build the shared state
    pub async fn build_state(&self) -> Result<AppState> {
        let database = match &self.database {
            Some(database) => database.clone(),
            None => storage::open(&self.config.database).await?,
        };

        if self.config.seed_demo_data {
            seed_demo_data(&database).await?;
        }

        let secret = self.config.signing_secret();
        Ok(match &self.hasher {
            Some(hasher) => AppState::with_hasher(database, hasher.clone(), &secret),
            None => AppState::new(database, &secret),
        })
    }

    /// Build the router with all routes and state
    pub async fn build(&self) -> Result<Router> {
        Ok(build_router(self.build_state().await?))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds to `server.host:server.port` and stops on Ctrl+C or SIGTERM.
    pub async fn serve(self) -> Result<()> {
        let app = self.build().await?;
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Insert the demo villas unless the table already holds any
async fn seed_demo_data(database: &Arc<dyn Database>) -> Result<()> {
    let store = EntityStore::<Villa>::new(database.clone());
    let existing = store
        .get_all(None, &IncludeSpec::none(), Page::new(1, 1))
        .await?;
    if !existing.is_empty() {
        tracing::debug!("Villa table not empty, skipping seed");
        return Ok(());
    }

    let villas = seed_villas(Utc::now());
    let count = villas.len();
    for villa in villas {
        store.create(villa).await?;
    }
    tracing::info!(count, "Seeded demo villas");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
