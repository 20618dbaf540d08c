use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::filter::{FilterError, Predicate, RecordOrder};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] FilterError),

    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                StoreError::Unavailable(err.to_string())
            }
            DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
            DatabaseError::QueryError(msg) => StoreError::Query(msg),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Persistence collaborator for one record type.
///
/// `count` and `find` take the same predicate so a listing can report the
/// total alongside one window of results. `get` and `update` only see live
/// (not soft-deleted) records.
#[async_trait]
pub trait RecordStore<T: Entity>: Send + Sync {
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError>;

    async fn find(
        &self,
        predicate: &Predicate,
        order: &RecordOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError>;

    async fn insert(&self, record: T) -> Result<T, StoreError>;

    /// Replaces a live record by id; `NotFound` when absent or already deleted.
    async fn update(&self, record: T) -> Result<T, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
