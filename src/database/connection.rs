//! Postgres pool setup
//!
//! Every pooled connection carries the engine's `lock_timeout`, so a unit of
//! work stuck behind another slot lock fails with SQLSTATE 55P03 and is
//! retried as a concurrency conflict instead of running into the attempt
//! deadline.

use std::time::Duration;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};
use crate::config::{DatabaseConfig, EngineConfig};
use crate::utils::errors::SignupError;

pub type DatabasePool = PgPool;

/// Pool options derived from the database and engine settings
pub fn pool_options(database: &DatabaseConfig, engine: &EngineConfig) -> PgPoolOptions {
    let lock_timeout_ms = engine.lock_timeout().as_millis();

    PgPoolOptions::new()
        .max_connections(database.max_connections)
        .min_connections(database.min_connections)
        .acquire_timeout(Duration::from_secs(database.acquire_timeout_seconds))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                // SET does not accept bind parameters.
                let statement = format!("SET lock_timeout = '{}ms'", lock_timeout_ms);
                sqlx::query(&statement).execute(conn).await?;
                debug!(lock_timeout_ms = lock_timeout_ms, "Connection configured");
                Ok(())
            })
        })
}

/// Connect a pool for the engine and verify it answers
pub async fn create_pool(database: &DatabaseConfig, engine: &EngineConfig) -> Result<DatabasePool, SignupError> {
    let pool = pool_options(database, engine).connect(&database.url).await?;
    health_check(&pool).await?;

    info!(
        max_connections = database.max_connections,
        lock_timeout_ms = engine.lock_timeout_ms,
        "Database connection pool created"
    );
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), SignupError> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<(), SignupError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
