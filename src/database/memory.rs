use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::entity::Entity;
use crate::database::store::{RecordStore, StoreError};
use crate::filter::filter_order::TIE_BREAKER;
use crate::filter::{Condition, FieldValue, Predicate, RecordOrder, SortDirection};

/// Record store kept in process memory. Used when no database is configured
/// and throughout the test suite.
pub struct MemoryStore<T> {
    records: RwLock<HashMap<Uuid, T>>,
    offline: AtomicBool,
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self { records: RwLock::new(HashMap::new()), offline: AtomicBool::new(false) }
    }

    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let map = records.into_iter().map(|record| (record.id(), record)).collect();
        Self { records: RwLock::new(map), offline: AtomicBool::new(false) }
    }

    /// Simulates losing the backing store; every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

/// Evaluates a predicate the same way the SQL rendering does.
pub fn matches<T: Entity>(predicate: &Predicate, record: &T) -> bool {
    if !predicate.include_deleted && record.is_deleted() {
        return false;
    }
    predicate.conditions.iter().all(|condition| match condition {
        Condition::Equals { field, value } => record.field(field).as_ref() == Some(value),
        Condition::NotEquals { field, value } => record.field(field).as_ref() != Some(value),
        Condition::Contains { field, needle } => match record.field(field) {
            Some(FieldValue::Text(text)) => text.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        },
        Condition::Range { field, start, end } => {
            match record.field(field).and_then(|v| v.as_timestamp()) {
                Some(ts) => start.map_or(true, |s| ts >= s) && end.map_or(true, |e| ts <= e),
                None => false,
            }
        }
    })
}

fn compare_by<T: Entity>(order: &RecordOrder, a: &T, b: &T) -> Ordering {
    let primary = match (a.field(&order.field), b.field(&order.field)) {
        (Some(x), Some(y)) => x.compare(&y),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };
    let primary = match order.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    if order.field == TIE_BREAKER {
        return primary;
    }
    primary.then_with(|| a.id().cmp(&b.id()))
}

#[async_trait]
impl<T: Entity> RecordStore<T> for MemoryStore<T> {
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        self.ensure_online()?;
        let records = self.records.read().await;
        Ok(records.values().filter(|r| matches(predicate, *r)).count() as u64)
    }

    async fn find(
        &self,
        predicate: &Predicate,
        order: &RecordOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>, StoreError> {
        self.ensure_online()?;
        let records = self.records.read().await;
        let mut selected: Vec<&T> = records.values().filter(|r| matches(predicate, *r)).collect();
        selected.sort_by(|a, b| compare_by(order, *a, *b));
        Ok(selected
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.ensure_online()?;
        let records = self.records.read().await;
        Ok(records.get(&id).filter(|r| !r.is_deleted()).cloned())
    }

    async fn insert(&self, record: T) -> Result<T, StoreError> {
        self.ensure_online()?;
        let mut records = self.records.write().await;
        if records.contains_key(&record.id()) {
            return Err(StoreError::Duplicate(format!("id {}", record.id())));
        }
        records.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn update(&self, record: T) -> Result<T, StoreError> {
        self.ensure_online()?;
        let mut records = self.records.write().await;
        let live = records.get(&record.id()).map_or(false, |existing| !existing.is_deleted());
        if !live {
            return Err(StoreError::NotFound(record.id()));
        }
        records.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.ensure_online()
    }
}
