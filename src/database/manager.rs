use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Process-wide Postgres pool, created lazily from `DATABASE_URL`.
pub struct DatabaseManager {
    pool: RwLock<Option<PgPool>>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager { pool: RwLock::new(None) })
    }

    const APPLICATION_NAME: &'static str = "expedientes-api";

    pub async fn main_pool() -> Result<PgPool, DatabaseError> {
        Self::instance().get_pool().await
    }

    async fn get_pool(&self) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pool = self.pool.read().await;
            if let Some(pool) = pool.as_ref() {
                return Ok(pool.clone());
            }
        }

        let mut slot = self.pool.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let base = config::config()
            .database
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let connection_string = Self::build_connection_string(base)?;

        let settings = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout))
            .connect(&connection_string)
            .await?;

        *slot = Some(pool.clone());
        info!("Created database pool (max_connections={})", settings.max_connections);
        Ok(pool)
    }

    /// Validates the URL scheme and tags connections with the application name.
    fn build_connection_string(base: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        if url.path().trim_start_matches('/').is_empty() {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        if !url.query_pairs().any(|(k, _)| k == "application_name") {
            url.query_pairs_mut().append_pair("application_name", Self::APPLICATION_NAME);
        }
        Ok(url.into())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close_all() {
        let mut slot = Self::instance().pool.write().await;
        if let Some(pool) = slot.take() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}
