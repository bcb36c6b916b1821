//! Configuration for opening a preference repository.

use common::StorageConfig;
use serde::{Deserialize, Serialize};

/// Configuration for opening a [`PreferencesRepository`](crate::PreferencesRepository).
///
/// # Example
///
/// ```ignore
/// use common::StorageConfig;
/// use preferences::{Config, PreferencesRepository};
///
/// let config = Config {
///     storage: StorageConfig::InMemory,
/// };
/// let repository = PreferencesRepository::open(config).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}
