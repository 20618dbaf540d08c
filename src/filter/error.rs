use thiserror::Error;

/// Every variant surfaces to callers as an invalid query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Unknown filter field: {0}")]
    UnknownField(String),

    #[error("Cannot sort by field: {0}")]
    UnsortableField(String),

    #[error("Invalid value '{value}' for field '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid sort order: {0} (expected asc or desc)")]
    InvalidSortOrder(String),

    #[error("Invalid date for '{field}': {value}")]
    InvalidDate { field: String, value: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),
}
