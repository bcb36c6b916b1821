//! Immutable snapshots of the store and the mutable view used by transactions.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::value::{Key, PreferenceType, PreferenceValue};

/// Reads a typed value, treating a value of the wrong type as absent.
fn typed_get<T: PreferenceType>(
    entries: &BTreeMap<String, PreferenceValue>,
    key: &Key<T>,
) -> Option<T> {
    let value = entries.get(key.name())?;
    let typed = T::from_value(value);
    if typed.is_none() {
        tracing::warn!(
            key = key.name(),
            expected = T::TYPE_NAME,
            found = value.type_name(),
            "stored preference has unexpected type"
        );
    }
    typed
}

/// A point-in-time, immutable view of every name/value pair in the store.
///
/// Cloning is cheap; the underlying map is shared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Preferences {
    entries: Arc<BTreeMap<String, PreferenceValue>>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, or `None` if absent.
    pub fn get<T: PreferenceType>(&self, key: &Key<T>) -> Option<T> {
        typed_get(&self.entries, key)
    }

    pub fn contains<T>(&self, key: &Key<T>) -> bool {
        self.entries.contains_key(key.name())
    }

    /// Returns the raw stored value for a name, whatever its type.
    pub fn get_value(&self, name: &str) -> Option<&PreferenceValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PreferenceValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies this snapshot into a mutable view.
    pub fn to_mutable(&self) -> MutablePreferences {
        MutablePreferences {
            entries: (*self.entries).clone(),
        }
    }
}

/// Mutable view of a snapshot, handed to [`Storage::edit`](super::Storage::edit)
/// transforms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutablePreferences {
    entries: BTreeMap<String, PreferenceValue>,
}

impl MutablePreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: PreferenceType>(&self, key: &Key<T>) -> Option<T> {
        typed_get(&self.entries, key)
    }

    pub fn contains<T>(&self, key: &Key<T>) -> bool {
        self.entries.contains_key(key.name())
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<T: PreferenceType>(&mut self, key: &Key<T>, value: T) {
        self.entries
            .insert(key.name().to_string(), value.into_value());
    }

    /// Stores `value` under `key`, or removes the key when `value` is `None`.
    pub fn set_nullable<T: PreferenceType>(&mut self, key: &Key<T>, value: Option<T>) {
        match value {
            Some(value) => self.set(key, value),
            None => {
                self.remove(key);
            }
        }
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove<T>(&mut self, key: &Key<T>) -> bool {
        self.entries.remove(key.name()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Converts this view into an immutable snapshot.
    pub fn freeze(self) -> Preferences {
        Preferences {
            entries: Arc::new(self.entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::value::{int_key, string_key};

    #[test]
    fn should_read_back_set_value() {
        // given
        let mut prefs = MutablePreferences::new();
        let key = int_key("count");

        // when
        prefs.set(&key, 7);
        let frozen = prefs.freeze();

        // then
        assert_eq!(frozen.get(&key), Some(7));
        assert!(frozen.contains(&key));
        assert_eq!(frozen.len(), 1);
    }

    #[test]
    fn should_remove_key_when_setting_none() {
        // given
        let key = string_key("name");
        let mut prefs = MutablePreferences::new();
        prefs.set(&key, "alice".to_string());

        // when
        prefs.set_nullable(&key, None);

        // then
        assert!(!prefs.contains(&key));
        assert!(prefs.freeze().is_empty());
    }

    #[test]
    fn should_treat_mismatched_type_as_absent() {
        // given
        let mut prefs = MutablePreferences::new();
        prefs.set(&string_key("slot"), "text".to_string());
        let snapshot = prefs.freeze();

        // when
        let read = snapshot.get(&int_key("slot"));

        // then
        assert_eq!(read, None);
        assert!(snapshot.get_value("slot").is_some());
    }

    #[test]
    fn should_not_affect_snapshot_when_editing_copy() {
        // given
        let key = int_key("count");
        let mut prefs = MutablePreferences::new();
        prefs.set(&key, 1);
        let snapshot = prefs.freeze();

        // when
        let mut copy = snapshot.to_mutable();
        copy.set(&key, 2);

        // then
        assert_eq!(snapshot.get(&key), Some(1));
        assert_eq!(copy.get(&key), Some(2));
    }
}
