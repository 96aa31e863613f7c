//! Plaza application composition root
//!
//! Picks the store backend from configuration and mounts the messaging
//! routes next to the shared infrastructure routes.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use plaza_auth::{AuthBackend, AuthConfig};
use plaza_common::Config;
use plaza_messaging::{
    InMemoryParticipantDirectory, MessagingRepositories, MessagingService, MessagingState,
    ParticipantProfile, SystemClock,
};
use sqlx::postgres::PgPoolOptions;

/// Upper bound on pooled Postgres connections
const MAX_DB_CONNECTIONS: u32 = 10;

/// Build the store set selected by `config`.
///
/// With `DATABASE_URL` set this connects, applies migrations and returns the
/// Postgres stores. Without it the in-memory stores are used, with the
/// directory seeded from `DIRECTORY_SEED_FILE` when given.
pub async fn build_repositories(config: &Config) -> anyhow::Result<MessagingRepositories> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(MAX_DB_CONNECTIONS)
                .acquire_timeout(config.store_timeout)
                .connect(url)
                .await
                .context("Database connection failed")?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!("Database connection established, migrations applied");
            Ok(MessagingRepositories::postgres(pool))
        }
        None => {
            let directory = match &config.directory_seed_file {
                Some(path) => load_directory_seed(path)?,
                None => InMemoryParticipantDirectory::default(),
            };
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            Ok(MessagingRepositories::in_memory(
                Arc::new(directory),
                Arc::new(SystemClock),
            ))
        }
    }
}

/// Read a JSON array of participant profiles
fn load_directory_seed(path: &Path) -> anyhow::Result<InMemoryParticipantDirectory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read directory seed {}", path.display()))?;
    let profiles: Vec<ParticipantProfile> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid directory seed {}", path.display()))?;

    tracing::info!(count = profiles.len(), "Loaded participant directory seed");
    Ok(InMemoryParticipantDirectory::from_profiles(profiles))
}

/// Create the main application router
pub fn create_app(config: &Config, repos: MessagingRepositories) -> Router {
    let auth = AuthBackend::new(AuthConfig {
        jwt_secret: config.jwt_secret.clone(),
        issuer: config.jwt_issuer.clone(),
        audience: config.jwt_audience.clone(),
    });
    let service = MessagingService::new(repos).with_store_timeout(config.store_timeout);

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(|| async { "Plaza Messaging API" }))
        .merge(plaza_messaging::routes().with_state(MessagingState::new(service, auth)))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
