//! Error types for preference repository operations.

use common::StorageError;

/// Error type for preference repository operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A transaction was rejected by the backing store.
    Storage(String),

    /// Internal errors, such as a save task that panicked or was aborted.
    Internal(String),

    /// A batched map was asked for a key it was not built with.
    UnknownKey(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
            Error::UnknownKey(key) => write!(f, "Unknown key: {}", key),
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

impl From<Error> for storeflow::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Storage(msg) => storeflow::Error::Storage(msg),
            Error::Internal(msg) => storeflow::Error::Internal(msg),
            Error::UnknownKey(key) => {
                storeflow::Error::Internal(format!("unknown key: {}", key))
            }
        }
    }
}

/// Result type alias for preference repository operations.
pub type Result<T> = std::result::Result<T, Error>;
