//! The repository facade: typed flows, saves and reactive value factories over
//! one backing store.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::hash::Hash;
use std::sync::Arc;

use chrono::NaiveDateTime;
use common::storage::factory::create_storage;
use common::{Key, MutablePreferences, PreferenceType, Preferences, Storage, transform};
use storeflow::{Flow, StoreFlow};
use tokio::runtime::Handle;
use url::Url;

use crate::codec::{
    Codec, DEFAULT_STRING_VALUE, EnumCodec, FnCodec, ListCodec, LocalDateTimeCodec, Ordinal,
    UriCodec,
};
use crate::config::Config;
use crate::entry::{DefaultFn, Entry, EnumEntry, LocalDateTimeEntry, UriEntry};
use crate::error::{Error, Result};
use crate::map::StoreFlowMap;

/// Stages one key's write inside a transaction.
fn write<T: PreferenceType>(prefs: &mut MutablePreferences, key: &Key<T>, value: T) {
    tracing::info!(key = key.name(), value = ?value, "saved preference");
    prefs.set(key, value);
}

/// Text stored for an optional value; `None` becomes the sentinel.
fn string_representation<T: Display>(value: Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => DEFAULT_STRING_VALUE.to_string(),
    }
}

fn ordinal_of<E: Ordinal>(key: &Key<i32>, value: &E) -> Result<i32> {
    value.ordinal().ok_or_else(|| {
        Error::Internal(format!(
            "value saved under {} is not one of its enum's variants",
            key.name()
        ))
    })
}

/// Typed access to one preference store.
///
/// Reads are [`Flow`]s that emit the current value on subscription and then
/// every change; a missing or undecodable value reads as the default. Saves
/// run one store transaction each, on the repository's I/O runtime, and
/// complete once it has committed.
///
/// Concrete repositories wrap a `PreferencesRepository` and expose
/// application-level flows built with its factories.
///
/// # Example
///
/// ```ignore
/// use common::int_key;
/// use preferences::{Config, PreferencesRepository};
///
/// let repository = PreferencesRepository::open(Config::default()).await?;
/// let launches = repository.store_flow(&int_key("launches"), || 0);
///
/// launches.save(launches.flow().first().await.unwrap_or(0) + 1).await?;
/// ```
#[derive(Clone)]
pub struct PreferencesRepository {
    storage: Arc<dyn Storage>,
    io_runtime: Handle,
}

impl fmt::Debug for PreferencesRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferencesRepository").finish_non_exhaustive()
    }
}

impl PreferencesRepository {
    /// Opens a repository over storage created from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized.
    pub async fn open(config: Config) -> Result<Self> {
        RepositoryBuilder::new(config).build().await
    }

    /// Creates a repository over `storage` that runs saves on the current
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_io_runtime(storage, Handle::current())
    }

    /// Creates a repository over `storage` that runs saves on `io_runtime`.
    pub fn with_io_runtime(storage: Arc<dyn Storage>, io_runtime: Handle) -> Self {
        Self {
            storage,
            io_runtime,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Every committed snapshot of the store, starting with the current one.
    pub fn data(&self) -> Flow<Preferences> {
        Flow::from_watch(self.storage.data())
    }

    /// Makes every committed save durable.
    pub async fn flush(&self) -> Result<()> {
        self.storage.flush().await?;
        Ok(())
    }

    /// Flushes, then closes the backing store. The store is left open when
    /// the flush fails.
    pub async fn close(&self) -> Result<()> {
        self.flush().await?;
        self.storage.close().await?;
        tracing::debug!("closed preferences repository");
        Ok(())
    }

    // ---- reads ----

    /// The value under `key`, or `default()` while the key is absent.
    pub fn get_flow<T, F>(&self, key: &Key<T>, default: F) -> Flow<T>
    where
        T: PreferenceType,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let key = key.clone();
        self.data()
            .map(move |prefs| prefs.get(&key).unwrap_or_else(&default))
    }

    /// Like [`get_flow`](Self::get_flow) for a default that may itself be
    /// absent.
    pub fn get_optional_flow<T, F>(&self, key: &Key<T>, default: F) -> Flow<Option<T>>
    where
        T: PreferenceType,
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let key = key.clone();
        self.data().map(move |prefs| prefs.get(&key).or_else(&default))
    }

    pub fn get_entry_flow<T: PreferenceType>(&self, entry: &Entry<T>) -> Flow<T> {
        let default = entry.default_fn();
        self.get_flow(entry.key(), move || default())
    }

    pub fn get_uri_flow<F>(&self, key: &Key<String>, default: F) -> Flow<Option<Url>>
    where
        F: Fn() -> Option<Url> + Send + Sync + 'static,
    {
        self.converted_flow(key, Arc::new(default), Arc::new(UriCodec))
    }

    pub fn get_uri_entry_flow(&self, entry: &UriEntry) -> Flow<Option<Url>> {
        self.converted_flow(entry.key(), entry.default_fn(), Arc::new(UriCodec))
    }

    pub fn get_local_date_time_flow<F>(
        &self,
        key: &Key<String>,
        default: F,
    ) -> Flow<Option<NaiveDateTime>>
    where
        F: Fn() -> Option<NaiveDateTime> + Send + Sync + 'static,
    {
        self.converted_flow(key, Arc::new(default), Arc::new(LocalDateTimeCodec))
    }

    pub fn get_local_date_time_entry_flow(
        &self,
        entry: &LocalDateTimeEntry,
    ) -> Flow<Option<NaiveDateTime>> {
        self.converted_flow(entry.key(), entry.default_fn(), Arc::new(LocalDateTimeCodec))
    }

    /// The enum stored by ordinal under `key`. An ordinal with no matching
    /// variant reads as the default.
    pub fn get_enum_flow<E, F>(&self, key: &Key<i32>, default: F) -> Flow<E>
    where
        E: Ordinal + Send + 'static,
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.converted_flow(key, Arc::new(default), Arc::new(EnumCodec::new()))
    }

    pub fn get_enum_entry_flow<E>(&self, entry: &EnumEntry<E>) -> Flow<E>
    where
        E: Ordinal + Send + 'static,
    {
        self.converted_flow(entry.key(), entry.default_fn(), Arc::new(EnumCodec::new()))
    }

    /// Reads `key` through `codec`.
    ///
    /// An absent key reads as the encoded default, and anything the codec
    /// cannot decode reads as the default itself.
    fn converted_flow<E, C>(
        &self,
        key: &Key<C::Savable>,
        default: DefaultFn<E>,
        codec: Arc<C>,
    ) -> Flow<E>
    where
        E: Send + 'static,
        C: Codec<E>,
    {
        let key = key.clone();
        self.data().map(move |prefs| {
            let savable = prefs.get(&key).unwrap_or_else(|| codec.encode(&default()));
            codec.decode(savable).unwrap_or_else(|| default())
        })
    }

    // ---- saves ----

    pub async fn save<T: PreferenceType>(&self, key: &Key<T>, value: T) -> Result<()> {
        let key = key.clone();
        self.edit(move |prefs| write(prefs, &key, value)).await
    }

    /// Stores `value`, or removes the key when `value` is `None`.
    pub async fn save_nullable<T: PreferenceType>(
        &self,
        key: &Key<T>,
        value: Option<T>,
    ) -> Result<()> {
        let key = key.clone();
        self.edit(move |prefs| match value {
            Some(value) => write(prefs, &key, value),
            None => {
                tracing::info!(key = key.name(), "removed preference");
                prefs.remove(&key);
            }
        })
        .await
    }

    /// Stores the text form of `value`, or [`DEFAULT_STRING_VALUE`] for
    /// `None`.
    pub async fn save_string_representation<T>(
        &self,
        key: &Key<String>,
        value: Option<T>,
    ) -> Result<()>
    where
        T: Display + Send,
    {
        let text = string_representation(value);
        self.save(key, text).await
    }

    /// Stores the ordinal of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] without writing when `value` has no
    /// ordinal.
    pub async fn save_enum<E>(&self, key: &Key<i32>, value: &E) -> Result<()>
    where
        E: Ordinal + Sync,
    {
        let ordinal = ordinal_of(key, value)?;
        self.save(key, ordinal).await
    }

    /// Writes every pair in one transaction.
    pub(crate) async fn save_all<T: PreferenceType>(&self, writes: Vec<(Key<T>, T)>) -> Result<()> {
        self.edit(move |prefs| {
            for (key, value) in writes {
                write(prefs, &key, value);
            }
        })
        .await
    }

    /// Runs `f` as one store transaction on the I/O runtime and waits for it
    /// to commit.
    async fn edit<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut MutablePreferences) + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let task = self
            .io_runtime
            .spawn(async move { storage.edit(transform(f)).await });
        let committed = task
            .await
            .map_err(|e| Error::Internal(format!("save task failed: {}", e)))?;
        committed?;
        Ok(())
    }

    // ---- reactive values ----

    pub fn store_flow<T, F>(&self, key: &Key<T>, default: F) -> StoreFlow<T>
    where
        T: PreferenceType,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.entry_store_flow(&Entry::new(key.clone(), default))
    }

    pub fn entry_store_flow<T: PreferenceType>(&self, entry: &Entry<T>) -> StoreFlow<T> {
        let repository = self.clone();
        let key = entry.key().clone();
        StoreFlow::new(
            self.get_entry_flow(entry),
            entry.default_value(),
            move |value| {
                let repository = repository.clone();
                let key = key.clone();
                async move {
                    repository
                        .save(&key, value)
                        .await
                        .map_err(storeflow::Error::from)
                }
            },
        )
    }

    /// A reactive value whose `None` removes the key.
    pub fn optional_store_flow<T, F>(&self, key: &Key<T>, default: F) -> StoreFlow<Option<T>>
    where
        T: PreferenceType,
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let initial = default();
        let flow = self.get_optional_flow(key, default);
        let repository = self.clone();
        let key = key.clone();
        StoreFlow::new(flow, initial, move |value| {
            let repository = repository.clone();
            let key = key.clone();
            async move {
                repository
                    .save_nullable(&key, value)
                    .await
                    .map_err(storeflow::Error::from)
            }
        })
    }

    /// An enum stored by ordinal. Saving a value with no ordinal fails with
    /// [`storeflow::Error::Internal`] and leaves the store untouched.
    pub fn enum_store_flow<E, F>(&self, key: &Key<i32>, default: F) -> StoreFlow<E>
    where
        E: Ordinal + Clone + Send + Sync + 'static,
        F: Fn() -> E + Send + Sync + 'static,
    {
        let initial = default();
        let flow = self.get_enum_flow(key, default);
        let repository = self.clone();
        let key = key.clone();
        StoreFlow::new(flow, initial, move |value: E| {
            let repository = repository.clone();
            let key = key.clone();
            async move {
                repository
                    .save_enum(&key, &value)
                    .await
                    .map_err(storeflow::Error::from)
            }
        })
    }

    pub fn uri_store_flow<F>(&self, key: &Key<String>, default: F) -> StoreFlow<Option<Url>>
    where
        F: Fn() -> Option<Url> + Send + Sync + 'static,
    {
        self.converted_store_flow(key, default, UriCodec)
    }

    pub fn local_date_time_store_flow<F>(
        &self,
        key: &Key<String>,
        default: F,
    ) -> StoreFlow<Option<NaiveDateTime>>
    where
        F: Fn() -> Option<NaiveDateTime> + Send + Sync + 'static,
    {
        self.converted_store_flow(key, default, LocalDateTimeCodec)
    }

    /// A list stored as its elements joined by `separator`.
    ///
    /// No serialized element may contain `separator`.
    pub fn list_store_flow<T, F, S, D>(
        &self,
        key: &Key<String>,
        default: F,
        separator: &str,
        serialize: S,
        deserialize: D,
    ) -> StoreFlow<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Vec<T> + Send + Sync + 'static,
        S: Fn(&T) -> String + Send + Sync + 'static,
        D: Fn(&str) -> T + Send + Sync + 'static,
    {
        self.converted_store_flow(
            key,
            default,
            ListCodec::new(separator, serialize, deserialize),
        )
    }

    /// A list stored through whole-list conversion functions.
    pub fn list_store_flow_with<T, F, S, D>(
        &self,
        key: &Key<String>,
        default: F,
        serialize: S,
        deserialize: D,
    ) -> StoreFlow<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Vec<T> + Send + Sync + 'static,
        S: Fn(&[T]) -> String + Send + Sync + 'static,
        D: Fn(&str) -> Vec<T> + Send + Sync + 'static,
    {
        self.fn_store_flow(
            key,
            default,
            move |list: &Vec<T>| serialize(list.as_slice()),
            move |text: String| deserialize(&text),
        )
    }

    /// A reactive value converted by a pair of closures.
    pub fn fn_store_flow<E, S, F, G, H>(
        &self,
        key: &Key<S>,
        default: F,
        to_savable: G,
        to_external: H,
    ) -> StoreFlow<E>
    where
        E: Clone + Send + Sync + 'static,
        S: PreferenceType,
        F: Fn() -> E + Send + Sync + 'static,
        G: Fn(&E) -> S + Send + Sync + 'static,
        H: Fn(S) -> E + Send + Sync + 'static,
    {
        self.converted_store_flow(key, default, FnCodec::new(to_savable, to_external))
    }

    /// A reactive value stored under `key` in the form produced by `codec`.
    ///
    /// `default` is evaluated once for the flow's default and again on every
    /// read that falls back to it.
    pub fn converted_store_flow<E, C, F>(
        &self,
        key: &Key<C::Savable>,
        default: F,
        codec: C,
    ) -> StoreFlow<E>
    where
        E: Clone + Send + Sync + 'static,
        C: Codec<E>,
        F: Fn() -> E + Send + Sync + 'static,
    {
        let default: DefaultFn<E> = Arc::new(default);
        let codec = Arc::new(codec);
        let flow = self.converted_flow(key, Arc::clone(&default), Arc::clone(&codec));
        let repository = self.clone();
        let key = key.clone();
        StoreFlow::new(flow, default(), move |value: E| {
            let repository = repository.clone();
            let key = key.clone();
            let savable = codec.encode(&value);
            async move {
                repository
                    .save(&key, savable)
                    .await
                    .map_err(storeflow::Error::from)
            }
        })
    }

    // ---- batches ----

    /// Builds a batched map over `entries`.
    pub fn store_flow_map<K, T>(&self, entries: HashMap<K, Entry<T>>) -> StoreFlowMap<K, T>
    where
        K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
        T: PreferenceType,
    {
        StoreFlowMap::new(self.clone(), entries)
    }

    pub fn get_uri_flow_map(
        &self,
        entries: impl IntoIterator<Item = UriEntry>,
    ) -> HashMap<UriEntry, Flow<Option<Url>>> {
        entries
            .into_iter()
            .map(|entry| {
                let flow = self.get_uri_entry_flow(&entry);
                (entry, flow)
            })
            .collect()
    }

    pub fn get_local_date_time_flow_map(
        &self,
        entries: impl IntoIterator<Item = LocalDateTimeEntry>,
    ) -> HashMap<LocalDateTimeEntry, Flow<Option<NaiveDateTime>>> {
        entries
            .into_iter()
            .map(|entry| {
                let flow = self.get_local_date_time_entry_flow(&entry);
                (entry, flow)
            })
            .collect()
    }

    pub fn get_enum_valued_flow_map<E>(
        &self,
        entries: impl IntoIterator<Item = EnumEntry<E>>,
    ) -> HashMap<EnumEntry<E>, Flow<E>>
    where
        E: Ordinal + Send + 'static,
    {
        entries
            .into_iter()
            .map(|entry| {
                let flow = self.get_enum_entry_flow(&entry);
                (entry, flow)
            })
            .collect()
    }

    /// Stores the text form of every value in one transaction, `None` as
    /// [`DEFAULT_STRING_VALUE`].
    pub async fn save_string_representations<E, T>(
        &self,
        values: HashMap<Entry<E, String>, Option<T>>,
    ) -> Result<()>
    where
        T: Display + Send,
    {
        let writes = values
            .into_iter()
            .map(|(entry, value)| (entry.key().clone(), string_representation(value)))
            .collect();
        self.save_all(writes).await
    }

    /// Stores the ordinal of every value in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] without writing anything when any value
    /// has no ordinal.
    pub async fn save_enum_valued_map<E>(&self, values: HashMap<EnumEntry<E>, E>) -> Result<()>
    where
        E: Ordinal + Send,
    {
        let writes = values
            .into_iter()
            .map(|(entry, value)| Ok((entry.key().clone(), ordinal_of(entry.key(), &value)?)))
            .collect::<Result<Vec<_>>>()?;
        self.save_all(writes).await
    }
}

/// Builder for a [`PreferencesRepository`].
///
/// # Example
///
/// ```ignore
/// let io_runtime = tokio::runtime::Builder::new_multi_thread()
///     .worker_threads(1)
///     .enable_all()
///     .build()?;
///
/// let repository = RepositoryBuilder::new(Config::default())
///     .with_io_runtime(io_runtime.handle().clone())
///     .build()
///     .await?;
/// ```
pub struct RepositoryBuilder {
    config: Config,
    storage: Option<Arc<dyn Storage>>,
    io_runtime: Option<Handle>,
}

impl RepositoryBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            storage: None,
            io_runtime: None,
        }
    }

    /// Uses an existing storage instead of creating one from the config.
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the runtime that save transactions run on. Defaults to the
    /// runtime calling [`build`](Self::build).
    pub fn with_io_runtime(mut self, handle: Handle) -> Self {
        self.io_runtime = Some(handle);
        self
    }

    /// Builds the repository.
    pub async fn build(self) -> Result<PreferencesRepository> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => create_storage(&self.config.storage).await?,
        };
        let io_runtime = self.io_runtime.unwrap_or_else(Handle::current);
        Ok(PreferencesRepository::with_io_runtime(storage, io_runtime))
    }
}

#[cfg(test)]
mod tests {
    use common::storage::in_memory::{FailingStorage, InMemoryStorage};
    use common::{StorageError, StorageRead, int_key, string_key};
    use strum::EnumIter;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
    enum Theme {
        Light,
        Dark,
        System,
    }

    #[derive(Debug, Clone, Copy, PartialEq, EnumIter)]
    enum Mode {
        Auto,
        Fixed(u8),
    }

    fn repository() -> PreferencesRepository {
        PreferencesRepository::new(Arc::new(InMemoryStorage::new()))
    }

    async fn first<V: Send + 'static>(flow: &Flow<V>) -> V {
        flow.first().await.expect("flow completed without a value")
    }

    #[tokio::test]
    async fn should_emit_default_for_missing_key() {
        // given
        let repository = repository();

        // when
        let value = first(&repository.get_flow(&int_key("count"), || 7)).await;

        // then
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn should_emit_saved_value() {
        // given
        let repository = repository();
        let key = int_key("count");
        let flow = repository.get_flow(&key, || 0);

        // when
        repository.save(&key, 5).await.unwrap();

        // then
        assert_eq!(first(&flow).await, 5);
    }

    #[tokio::test]
    async fn should_follow_changes_after_subscribing() {
        // given
        let repository = repository();
        let key = int_key("count");
        let mut stream = repository.get_flow(&key, || 0).subscribe();
        assert_eq!(futures::StreamExt::next(&mut stream).await, Some(0));

        // when
        repository.save(&key, 1).await.unwrap();

        // then
        assert_eq!(futures::StreamExt::next(&mut stream).await, Some(1));
    }

    #[tokio::test]
    async fn should_remove_key_when_saving_none() {
        // given
        let repository = repository();
        let key = string_key("nickname");
        repository.save(&key, "neo".to_string()).await.unwrap();

        // when
        repository.save_nullable(&key, None).await.unwrap();

        // then
        let snapshot = repository.storage().snapshot().await.unwrap();
        assert!(!snapshot.contains(&key));
        let flow = repository.get_optional_flow(&key, || None);
        assert_eq!(first(&flow).await, None);
    }

    #[tokio::test]
    async fn should_read_uri_sentinel_as_default() {
        // given
        let repository = repository();
        let key = string_key("homepage");
        let fallback = Url::parse("https://fallback.example").unwrap();
        repository
            .save_string_representation::<Url>(&key, None)
            .await
            .unwrap();

        // when
        let value = first(&repository.get_uri_flow(&key, {
            let fallback = fallback.clone();
            move || Some(fallback.clone())
        }))
        .await;

        // then
        let snapshot = repository.storage().snapshot().await.unwrap();
        assert_eq!(snapshot.get(&key), Some(String::new()));
        assert_eq!(value, Some(fallback));
    }

    #[tokio::test]
    async fn should_read_saved_uri() {
        // given
        let repository = repository();
        let key = string_key("homepage");
        let url = Url::parse("https://example.com/a").unwrap();

        // when
        repository
            .save_string_representation(&key, Some(&url))
            .await
            .unwrap();

        // then
        let value = first(&repository.get_uri_flow(&key, || None)).await;
        assert_eq!(value, Some(url));
    }

    #[tokio::test]
    async fn should_read_date_time_saved_by_display_form() {
        // given
        let repository = repository();
        let key = string_key("last_sync");
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(8, 15, 0))
            .unwrap();

        // when
        repository
            .save_string_representation(&key, Some(at))
            .await
            .unwrap();

        // then
        let value = first(&repository.get_local_date_time_flow(&key, || None)).await;
        assert_eq!(value, Some(at));
    }

    #[tokio::test]
    async fn should_read_out_of_range_ordinal_as_default() {
        // given
        let repository = repository();
        let key = int_key("theme");
        repository.save(&key, 42).await.unwrap();

        // when
        let value = first(&repository.get_enum_flow(&key, || Theme::System)).await;

        // then
        assert_eq!(value, Theme::System);
    }

    #[tokio::test]
    async fn should_store_enum_by_ordinal() {
        // given
        let repository = repository();
        let key = int_key("theme");

        // when
        repository.save_enum(&key, &Theme::Dark).await.unwrap();

        // then
        let snapshot = repository.storage().snapshot().await.unwrap();
        assert_eq!(snapshot.get(&key), Some(1));
        let value = first(&repository.get_enum_flow(&key, || Theme::Light)).await;
        assert_eq!(value, Theme::Dark);
    }

    #[tokio::test]
    async fn should_save_through_converted_store_flow() {
        // given
        let repository = repository();
        let key = string_key("tags");
        let tags = repository.list_store_flow(
            &key,
            Vec::new,
            ",",
            |tag: &String| tag.clone(),
            |tag| tag.to_string(),
        );

        // when
        tags.save(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();

        // then
        let snapshot = repository.storage().snapshot().await.unwrap();
        assert_eq!(snapshot.get(&key), Some("a,b,c".to_string()));
        assert_eq!(
            first(tags.flow()).await,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[tokio::test]
    async fn should_save_list_with_whole_list_functions() {
        // given
        let repository = repository();
        let key = string_key("scores");
        let scores = repository.list_store_flow_with(
            &key,
            || vec![0],
            |list: &[i64]| {
                list.iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            },
            |text| text.split(' ').filter_map(|n| n.parse().ok()).collect(),
        );
        assert_eq!(first(scores.flow()).await, vec![0]);

        // when
        scores.save(vec![10, 20]).await.unwrap();

        // then
        let snapshot = repository.storage().snapshot().await.unwrap();
        assert_eq!(snapshot.get(&key), Some("10 20".to_string()));
        assert_eq!(first(scores.flow()).await, vec![10, 20]);
    }

    #[tokio::test]
    async fn should_encode_default_when_reading_missing_converted_key() {
        // given
        let repository = repository();
        let key = int_key("volume");
        let volume = repository.fn_store_flow(
            &key,
            || 0.5f64,
            |v: &f64| (*v * 100.0).round() as i32,
            |percent: i32| percent as f64 / 100.0,
        );

        // when
        let initial = first(volume.flow()).await;
        volume.save(0.25).await.unwrap();

        // then
        assert_eq!(initial, 0.5);
        assert_eq!(*volume.default(), 0.5);
        assert_eq!(first(volume.flow()).await, 0.25);
    }

    #[tokio::test]
    async fn should_save_none_through_optional_store_flow() {
        // given
        let repository = repository();
        let key = string_key("nickname");
        let nickname = repository.optional_store_flow(&key, || None);
        nickname.save(Some("trinity".to_string())).await.unwrap();

        // when
        nickname.save(None).await.unwrap();

        // then
        assert_eq!(first(nickname.flow()).await, None);
    }

    #[tokio::test]
    async fn should_write_string_representations_in_one_transaction() {
        // given
        let repository = repository();
        let home: UriEntry = Entry::with_default(string_key("home"), None);
        let work: UriEntry = Entry::with_default(string_key("work"), None);
        let mut rx = repository.storage().data();
        rx.borrow_and_update();

        // when
        let url = Url::parse("https://home.example").unwrap();
        repository
            .save_string_representations(HashMap::from([
                (home.clone(), Some(url.clone())),
                (work.clone(), None),
            ]))
            .await
            .unwrap();

        // then - one published snapshot carries both writes
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.get(home.key()), Some(url.to_string()));
        assert_eq!(snapshot.get(work.key()), Some(String::new()));
        assert!(!rx.has_changed().unwrap());

        let flows = repository.get_uri_flow_map([home.clone(), work.clone()]);
        assert_eq!(first(&flows[&home]).await, Some(url));
        assert_eq!(first(&flows[&work]).await, None);
    }

    #[tokio::test]
    async fn should_save_enum_valued_map() {
        // given
        let repository = repository();
        let light: EnumEntry<Theme> = Entry::with_default(int_key("day"), Theme::Light);
        let dark: EnumEntry<Theme> = Entry::with_default(int_key("night"), Theme::Dark);

        // when
        repository
            .save_enum_valued_map(HashMap::from([
                (light.clone(), Theme::System),
                (dark.clone(), Theme::Light),
            ]))
            .await
            .unwrap();

        // then
        let flows = repository.get_enum_valued_flow_map([light.clone(), dark.clone()]);
        assert_eq!(first(&flows[&light]).await, Theme::System);
        assert_eq!(first(&flows[&dark]).await, Theme::Light);
    }

    #[tokio::test]
    async fn should_run_saves_on_io_runtime() {
        // given
        let io_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let repository = RepositoryBuilder::new(Config::default())
            .with_io_runtime(io_runtime.handle().clone())
            .build()
            .await
            .unwrap();
        let key = int_key("count");

        // when
        repository.save(&key, 9).await.unwrap();

        // then
        assert_eq!(first(&repository.get_flow(&key, || 0)).await, 9);
        tokio::task::spawn_blocking(move || drop(io_runtime))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_report_aborted_save_as_internal_error() {
        // given
        let io_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let repository = PreferencesRepository::with_io_runtime(
            Arc::new(InMemoryStorage::new()),
            io_runtime.handle().clone(),
        );
        tokio::task::spawn_blocking(move || io_runtime.shutdown_background())
            .await
            .unwrap();

        // when
        let result = repository.save(&int_key("count"), 1).await;

        // then
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn should_reject_enum_value_without_ordinal() {
        // given
        let repository = repository();
        let key = int_key("mode");
        let mode = repository.enum_store_flow(&key, || Mode::Auto);
        let day: EnumEntry<Mode> = Entry::with_default(int_key("mode.day"), Mode::Auto);

        // when
        let direct = repository.save_enum(&key, &Mode::Fixed(3)).await;
        let through_flow = mode.save(Mode::Fixed(3)).await;
        let batched = repository
            .save_enum_valued_map(HashMap::from([(day.clone(), Mode::Fixed(3))]))
            .await;

        // then
        assert!(matches!(direct, Err(Error::Internal(_))));
        assert!(matches!(through_flow, Err(storeflow::Error::Internal(_))));
        assert!(matches!(batched, Err(Error::Internal(_))));
        assert!(repository.storage().snapshot().await.unwrap().is_empty());
        assert_eq!(first(mode.flow()).await, Mode::Auto);
    }

    #[tokio::test]
    async fn should_save_iterated_data_variant_through_enum_store_flow() {
        // given
        let repository = repository();
        let key = int_key("mode");
        let mode = repository.enum_store_flow(&key, || Mode::Auto);

        // when
        mode.save(Mode::Fixed(0)).await.unwrap();

        // then
        let snapshot = repository.storage().snapshot().await.unwrap();
        assert_eq!(snapshot.get(&key), Some(1));
        assert_eq!(first(mode.flow()).await, Mode::Fixed(0));
    }

    #[tokio::test]
    async fn should_propagate_flush_failure() {
        // given
        let storage = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let repository = PreferencesRepository::new(storage.clone());
        storage.fail_flush(StorageError::Storage("fsync failed".to_string()));

        // when
        let flushed = repository.flush().await;
        let closed = repository.close().await;

        // then
        assert_eq!(flushed, Err(Error::Storage("fsync failed".to_string())));
        assert_eq!(closed, Err(Error::Storage("fsync failed".to_string())));
    }

    #[tokio::test]
    async fn should_close_once_flush_failure_clears() {
        // given
        let storage = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let repository = PreferencesRepository::new(storage.clone());
        let key = int_key("count");
        repository.save(&key, 3).await.unwrap();
        storage.fail_flush(StorageError::Storage("fsync failed".to_string()));
        assert!(repository.close().await.is_err());

        // when
        storage.clear_failures();
        let flushed = repository.flush().await;
        let closed = repository.close().await;

        // then
        assert_eq!(flushed, Ok(()));
        assert_eq!(closed, Ok(()));
        assert_eq!(first(&repository.get_flow(&key, || 0)).await, 3);
    }
}
