use serde::Serialize;
use uuid::Uuid;

use crate::filter::{FieldSpec, FieldValue};

/// A soft-deletable record type that the filter and stores know how to query.
pub trait Entity: Clone + Send + Sync + Serialize + 'static {
    const TABLE: &'static str;
    const FIELDS: &'static [FieldSpec];
    /// Field constrained by a search request's date range.
    const DATE_FIELD: &'static str;
    const DEFAULT_SORT: &'static str = "created_at";

    fn id(&self) -> Uuid;

    /// Current value of a named field, `None` when unknown or null.
    fn field(&self, name: &str) -> Option<FieldValue>;

    fn is_deleted(&self) -> bool;
}
