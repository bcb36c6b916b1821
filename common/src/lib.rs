//! Storage contract shared by the preference crates.
//!
//! The store maps names to [`PreferenceValue`]s. Readers observe it through a
//! `watch` channel of immutable [`Preferences`] snapshots, and writers mutate it
//! with [`Storage::edit`], which applies a transform atomically.

pub mod storage;

pub use storage::config::StorageConfig;
pub use storage::preferences::{MutablePreferences, Preferences};
pub use storage::value::{
    Key, PreferenceType, PreferenceValue, bool_key, bytes_key, double_key, float_key, int_key,
    long_key, string_key, string_set_key,
};
pub use storage::{Storage, StorageError, StorageRead, StorageResult, Transform, transform};
