//! Storage factory for creating storage instances from configuration.

use std::sync::Arc;

use super::config::StorageConfig;
use super::in_memory::InMemoryStorage;
use super::preferences::Preferences;
use super::{Storage, StorageResult};

/// Creates an empty storage instance based on the provided configuration.
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    create_storage_with_preferences(config, Preferences::new()).await
}

/// Creates a storage instance seeded with `initial`.
pub async fn create_storage_with_preferences(
    config: &StorageConfig,
    initial: Preferences,
) -> StorageResult<Arc<dyn Storage>> {
    match config {
        StorageConfig::InMemory => Ok(Arc::new(InMemoryStorage::with_preferences(initial))),
    }
}
