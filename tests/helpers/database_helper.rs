//! Test database helper utilities
//!
//! Postgres tests run against the database named by `TEST_DATABASE_URL` and
//! are skipped when it is unset.

use sqlx::PgPool;
use SignupEngine::config::Settings;
use SignupEngine::database::{create_pool, run_migrations, DatabaseService};
use SignupEngine::services::ServiceFactory;
use super::test_context::{init_test_logging, test_settings};

/// Test database helper that manages PostgreSQL test database setup
pub struct TestDatabase {
    pub pool: PgPool,
    pub service: DatabaseService,
    pub settings: Settings,
}

impl TestDatabase {
    /// Connect, migrate and wipe the test database, or `None` without `TEST_DATABASE_URL`
    pub async fn connect() -> Option<Self> {
        Self::connect_with(|_| {}).await
    }

    /// Like `connect`, with the test settings adjusted before the pool is built
    pub async fn connect_with(adjust: impl FnOnce(&mut Settings)) -> Option<Self> {
        init_test_logging();

        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping Postgres test");
            return None;
        };

        let mut settings = test_settings();
        settings.database.url = database_url;
        settings.database.max_connections = 20;
        settings.engine.transaction_timeout_ms = 10_000;
        adjust(&mut settings);

        let pool = create_pool(&settings.database, &settings.engine)
            .await
            .expect("Failed to connect to test database");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let db = Self {
            service: DatabaseService::new(pool.clone()),
            pool,
            settings,
        };
        db.cleanup().await.expect("Failed to clean test database");
        Some(db)
    }

    /// Engine wired to the Postgres repositories
    pub fn services(&self) -> ServiceFactory {
        ServiceFactory::with_database(&self.settings, &self.service)
    }

    /// Clean all test data from the database
    pub async fn cleanup(&self) -> Result<(), sqlx::Error> {
        sqlx::query("TRUNCATE event_sign_ups, slots, events RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Count records in a table
    pub async fn count_records(&self, table: &str) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", table);
        let count: (i64,) = sqlx::query_as(&query).fetch_one(&self.pool).await?;
        Ok(count.0)
    }
}
