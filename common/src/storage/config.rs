//! Storage backend configuration.

use serde::{Deserialize, Serialize};

/// Selects the backing store created by [`create_storage`](super::factory::create_storage).
///
/// # Example
///
/// ```ignore
/// let config: StorageConfig = serde_json::from_str(r#"{"type": "InMemory"}"#)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Process-local store; contents are lost when it is dropped.
    #[default]
    InMemory,
}
