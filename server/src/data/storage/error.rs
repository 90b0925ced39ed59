//! Storage error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Spans rejected: {0}")]
    Rejected(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
