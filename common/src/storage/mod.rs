pub mod config;
pub mod factory;
pub mod in_memory;
pub mod preferences;
pub mod value;

use async_trait::async_trait;
use tokio::sync::watch;

use self::preferences::{MutablePreferences, Preferences};

/// Mutation applied to the store inside one transaction.
pub type Transform = Box<dyn FnOnce(&mut MutablePreferences) + Send + 'static>;

/// Boxes a closure as a [`Transform`].
pub fn transform<F>(f: F) -> Transform
where
    F: FnOnce(&mut MutablePreferences) + Send + 'static,
{
    Box::new(f)
}

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage-related errors
    Storage(String),
    /// Internal errors
    Internal(String),
}

impl std::error::Error for StorageError {}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::Storage(msg) => write!(f, "Storage error: {}", msg),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Read side of the store.
#[async_trait]
pub trait StorageRead: Send + Sync {
    /// Returns a channel that always holds the latest committed snapshot.
    ///
    /// Every committed transaction that changes the store is published to all
    /// receivers before the transaction's `edit` call returns.
    fn data(&self) -> watch::Receiver<Preferences>;

    /// Returns the latest committed snapshot.
    async fn snapshot(&self) -> StorageResult<Preferences> {
        let rx = self.data();
        let snapshot = rx.borrow().clone();
        Ok(snapshot)
    }
}

/// The storage type encapsulates access to the underlying key-value store.
#[async_trait]
pub trait Storage: StorageRead {
    /// Applies `transform` to a mutable copy of the current snapshot and
    /// commits the result atomically.
    ///
    /// Transactions are serialized: each transform observes every change
    /// committed before it. Returns the committed snapshot.
    async fn edit(&self, transform: Transform) -> StorageResult<Preferences>;

    /// Flushes all pending writes to durable storage.
    async fn flush(&self) -> StorageResult<()>;

    /// Closes the storage, releasing any resources.
    async fn close(&self) -> StorageResult<()>;
}
