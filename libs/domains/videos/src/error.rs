use std::fmt::Display;

use scylla::errors::{ExecutionError, PrepareError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type VideoResult<T> = Result<T, VideoError>;

impl VideoError {
    /// Wrap any driver error (result decoding, paging, row deserialization)
    pub fn database(err: impl Display) -> Self {
        VideoError::Database(err.to_string())
    }
}

impl From<ExecutionError> for VideoError {
    fn from(err: ExecutionError) -> Self {
        VideoError::Database(err.to_string())
    }
}

impl From<PrepareError> for VideoError {
    fn from(err: PrepareError) -> Self {
        VideoError::Database(format!("prepare failed: {}", err))
    }
}
