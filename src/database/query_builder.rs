use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};

use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::filter::{Filter, FieldValue, Predicate, RecordOrder};

/// Runs filter-rendered statements against a pool with typed binds.
pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: Entity + for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new() -> Result<Self, DatabaseError> {
        let filter = Filter::for_entity::<T>().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(Self { filter, _phantom: std::marker::PhantomData })
    }

    pub fn predicate(mut self, predicate: Predicate) -> Result<Self, DatabaseError> {
        self.filter
            .where_clause(predicate)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(self)
    }

    pub fn order(mut self, order: RecordOrder) -> Result<Self, DatabaseError> {
        self.filter
            .order(order)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(self)
    }

    pub fn window(mut self, limit: i64, offset: i64) -> Result<Self, DatabaseError> {
        self.filter
            .limit(limit, Some(offset))
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.filter.to_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        if crate::config::CONFIG.database.enable_query_logging {
            tracing::debug!(query = %sql_result.query, params = sql_result.params.len(), "select");
        }
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result = self
            .filter
            .to_count_sql()
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        if crate::config::CONFIG.database.enable_query_logging {
            tracing::debug!(query = %sql_result.query, params = sql_result.params.len(), "count");
        }

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

pub fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q FieldValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        FieldValue::Text(s) => q.bind(s.as_str()),
        FieldValue::Integer(i) => q.bind(*i),
        FieldValue::Bool(b) => q.bind(*b),
        FieldValue::Uuid(id) => q.bind(*id),
        FieldValue::Timestamp(ts) => q.bind(*ts),
    }
}

pub fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q FieldValue,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        FieldValue::Text(s) => q.bind(s.as_str()),
        FieldValue::Integer(i) => q.bind(*i),
        FieldValue::Bool(b) => q.bind(*b),
        FieldValue::Uuid(id) => q.bind(*id),
        FieldValue::Timestamp(ts) => q.bind(*ts),
    }
}
