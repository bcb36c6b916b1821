//! Batched maps: many entries read as individual flows and written together.
//!
//! A map is built from application keys mapped to [`Entry`]s. Each key gets a
//! live flow over its entry, and [`save`](StoreFlowMap::save) writes any subset
//! of the keys in a single store transaction.

use std::collections::HashMap;
use std::collections::hash_map::Keys;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use common::PreferenceType;
use storeflow::{Flow, Scope, SharingStarted, StoreStateFlow};

use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::repository::PreferencesRepository;

/// Resolves application keys to entries and writes batches of them.
struct BatchSaver<K, T> {
    entries: HashMap<K, Entry<T>>,
    repository: PreferencesRepository,
}

impl<K, T> BatchSaver<K, T>
where
    K: Eq + Hash + fmt::Debug,
    T: PreferenceType,
{
    fn entry(&self, key: &K) -> Result<&Entry<T>> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::UnknownKey(format!("{:?}", key)))
    }

    /// Every key is resolved before anything is written.
    ///
    /// # Panics
    ///
    /// Panics if `values` holds a key this map was not built with.
    async fn save(&self, values: HashMap<K, T>) -> Result<()> {
        let mut writes = Vec::with_capacity(values.len());
        for (key, value) in values {
            let entry = self
                .entry(&key)
                .unwrap_or_else(|err| panic!("cannot save batched map: {}", err));
            writes.push((entry.key().clone(), value));
        }
        self.repository.save_all(writes).await
    }
}

/// Application keys mapped to live flows over their entries.
///
/// Built by [`PreferencesRepository::store_flow_map`].
pub struct StoreFlowMap<K, T> {
    flows: HashMap<K, Flow<T>>,
    saver: Arc<BatchSaver<K, T>>,
}

impl<K: Clone, T> Clone for StoreFlowMap<K, T> {
    fn clone(&self) -> Self {
        Self {
            flows: self.flows.clone(),
            saver: Arc::clone(&self.saver),
        }
    }
}

impl<K, T> StoreFlowMap<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    T: PreferenceType,
{
    pub(crate) fn new(repository: PreferencesRepository, entries: HashMap<K, Entry<T>>) -> Self {
        let flows = entries
            .iter()
            .map(|(key, entry)| (key.clone(), repository.get_entry_flow(entry)))
            .collect();
        Self {
            flows,
            saver: Arc::new(BatchSaver {
                entries,
                repository,
            }),
        }
    }

    pub fn flows(&self) -> &HashMap<K, Flow<T>> {
        &self.flows
    }

    pub fn get(&self, key: &K) -> Option<&Flow<T>> {
        self.flows.get(key)
    }

    pub fn keys(&self) -> Keys<'_, K, Flow<T>> {
        self.flows.keys()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Returns the entry `key` was built with.
    pub fn entry(&self, key: &K) -> Result<&Entry<T>> {
        self.saver.entry(key)
    }

    /// Writes every value in one transaction. Keys absent from `values` are
    /// left untouched.
    ///
    /// # Panics
    ///
    /// Panics if `values` holds a key this map was not built with.
    pub async fn save(&self, values: HashMap<K, T>) -> Result<()> {
        self.saver.save(values).await
    }

    /// Promotes every flow to a [`StoreStateFlow`] living in `scope`.
    pub fn state_in(&self, scope: &Scope, started: SharingStarted) -> StoreStateFlowMap<K, T>
    where
        T: PartialEq,
    {
        let states = self
            .saver
            .entries
            .iter()
            .map(|(key, entry)| {
                let state = self
                    .saver
                    .repository
                    .entry_store_flow(entry)
                    .state_in(scope, started);
                (key.clone(), state)
            })
            .collect();
        StoreStateFlowMap {
            states,
            saver: Arc::clone(&self.saver),
        }
    }
}

/// Application keys mapped to cached state flows, with the same batched save
/// as the [`StoreFlowMap`] it was promoted from.
pub struct StoreStateFlowMap<K, T> {
    states: HashMap<K, StoreStateFlow<T>>,
    saver: Arc<BatchSaver<K, T>>,
}

impl<K: Clone, T: Clone> Clone for StoreStateFlowMap<K, T> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
            saver: Arc::clone(&self.saver),
        }
    }
}

impl<K, T> StoreStateFlowMap<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    T: PreferenceType + PartialEq,
{
    pub fn states(&self) -> &HashMap<K, StoreStateFlow<T>> {
        &self.states
    }

    pub fn get(&self, key: &K) -> Option<&StoreStateFlow<T>> {
        self.states.get(key)
    }

    /// The cached value of every key.
    pub fn values(&self) -> HashMap<K, T> {
        self.states
            .iter()
            .map(|(key, state)| (key.clone(), state.value()))
            .collect()
    }

    pub fn keys(&self) -> Keys<'_, K, StoreStateFlow<T>> {
        self.states.keys()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn entry(&self, key: &K) -> Result<&Entry<T>> {
        self.saver.entry(key)
    }

    /// Writes every value in one transaction.
    ///
    /// # Panics
    ///
    /// Panics if `values` holds a key this map was not built with.
    pub async fn save(&self, values: HashMap<K, T>) -> Result<()> {
        self.saver.save(values).await
    }
}
