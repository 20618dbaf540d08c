use std::collections::HashMap;

use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::database::StoreError;
use crate::filter::FilterError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Well-formed request the current state does not allow, such as a wrong
    /// current password or touching a built-in profile.
    #[error("{0}")]
    Rejected(String),

    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>, field_errors: HashMap<String, String>) -> Self {
        ServiceError::Validation { message: message.into(), field_errors }
    }
}

impl From<FilterError> for ServiceError {
    fn from(err: FilterError) -> Self {
        ServiceError::InvalidQuery(err.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            StoreError::InvalidQuery(e) => ServiceError::InvalidQuery(e.to_string()),
            StoreError::NotFound(id) => ServiceError::NotFound(format!("Record {} not found", id)),
            StoreError::Duplicate(msg) => ServiceError::Conflict(msg),
            StoreError::Query(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
