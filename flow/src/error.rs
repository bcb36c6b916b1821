//! Error types for reactive value operations.

use common::StorageError;

/// Error type for reactive value operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A save was rejected by the backing store.
    Storage(String),

    /// Internal errors, such as a save task that panicked or a flow that
    /// completed before emitting a value.
    Internal(String),

    /// The enclosing scope was cancelled while waiting.
    Cancelled,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
            Error::Cancelled => write!(f, "scope cancelled"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Result type alias for reactive value operations.
pub type Result<T> = std::result::Result<T, Error>;
