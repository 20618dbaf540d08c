use std::sync::Arc;

use tracing::debug;

use crate::config;
use crate::database::{Entity, RecordStore};
use crate::filter::{Filter, SearchRequest};
use crate::services::error::ServiceError;
use crate::services::page::PageResult;

/// Filtered, paginated retrieval over one record store.
pub struct ListService<T: Entity> {
    store: Arc<dyn RecordStore<T>>,
    max_limit: i64,
}

impl<T: Entity> Clone for ListService<T> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), max_limit: self.max_limit }
    }
}

impl<T: Entity> ListService<T> {
    pub fn new(store: Arc<dyn RecordStore<T>>) -> Self {
        Self { store, max_limit: config::config().pagination.max_limit }
    }

    pub fn with_max_limit(mut self, max_limit: i64) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// Returns the requested page and the total number of matching records.
    ///
    /// The request is fully validated before the store is touched. A page past
    /// the end yields no items but still reports the real total.
    pub async fn list(&self, request: &SearchRequest) -> Result<PageResult<T>, ServiceError> {
        if request.page < 1 {
            return Err(ServiceError::InvalidQuery(format!(
                "page must be at least 1, got {}",
                request.page
            )));
        }
        if request.limit < 1 || request.limit > self.max_limit {
            return Err(ServiceError::InvalidQuery(format!(
                "limit must be between 1 and {}, got {}",
                self.max_limit, request.limit
            )));
        }

        let filter = Filter::for_entity::<T>()?;
        let (predicate, order) = filter.translate(request)?;

        let page = request.page as u64;
        let limit = request.limit as u64;
        // An offset that overflows is past any possible end.
        let skip = (page - 1).checked_mul(limit);

        // Count and fetch are separate reads; a concurrent write between them
        // can leave total and items off by one.
        let total = self.store.count(&predicate).await?;
        let items = match skip {
            Some(skip) if skip < total => self.store.find(&predicate, &order, skip, limit).await?,
            _ => Vec::new(),
        };

        if config::config().pagination.debug_logging {
            debug!(
                table = T::TABLE,
                page,
                limit,
                total,
                returned = items.len(),
                sort = %order.field,
                "listed records"
            );
        }

        Ok(PageResult::new(items, total, page, limit))
    }
}
