//! PostgreSQL pool behind [`crate::store::PgStore`]
//!
//! Owns connection setup, the startup retry loop, embedded migrations and a
//! scoped transaction wrapper for multi-statement writes.

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Upper bound for the delay between startup connection attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool and verify it with a round trip
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        debug!(
            "Pool config: max={}, min={}, acquire_timeout={:?}",
            config.max_connections, config.min_connections, config.connect_timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect_with(connect_options(config)?)
            .await
            .map_err(|e| Error::storage_with_source(format!("Failed to open pool: {}", e), e))?;

        let db = Self { pool };
        db.health_check().await?;

        info!("Database pool ready (size: {})", db.pool.size());
        Ok(db)
    }

    /// [`Database::connect`], retried with doubling delay while the failure is transient
    pub async fn connect_with_retry(
        config: &DatabaseConfig,
        attempts: u32,
        initial_delay: Duration,
    ) -> Result<Self> {
        retry(|| Self::connect(config), attempts, initial_delay).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations in `./migrations`
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source(format!("Health check failed: {}", e), e))?;
        Ok(())
    }

    pub async fn close(&self) {
        info!("Closing database pool...");
        self.pool.close().await;
    }
}

/// Parse the URL and apply statement cache and sqlx statement logging
fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.url).map_err(|e| Error::InvalidConfig {
        key: "DATABASE_URL",
        message: format!("Invalid database URL: {}", e).into(),
    })?;

    Ok(options
        .statement_cache_capacity(config.statement_cache_size)
        .log_statements(log::LevelFilter::Debug)
        .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(1)))
}

/// Scoped transaction.
///
/// Dropping it without [`Transaction::commit`] rolls back, so every early
/// return through `?` releases the connection with nothing written.
pub struct Transaction<'a> {
    tx: sqlx::Transaction<'a, sqlx::Postgres>,
}

impl<'a> Transaction<'a> {
    pub async fn begin(pool: &'a PgPool) -> Result<Self> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Connection to run queries on inside the transaction
    pub fn conn(&mut self) -> &mut sqlx::PgConnection {
        &mut self.tx
    }
}

async fn retry<T, F, Fut>(mut operation: F, attempts: u32, initial_delay: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!("Database attempt {}/{} failed: {}", attempt, attempts, e);
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
