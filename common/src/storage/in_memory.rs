#[cfg(any(test, feature = "test-utils"))]
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};

use super::preferences::Preferences;
use super::{Storage, StorageRead, StorageResult, Transform};

/// In-memory implementation of the Storage trait.
///
/// The latest snapshot lives in a `watch` channel, so every reader observes
/// each committed change. Transactions are serialized by a write lock; a
/// transaction that leaves the data unchanged publishes nothing.
pub struct InMemoryStorage {
    data_tx: watch::Sender<Preferences>,
    write_lock: Mutex<()>,
}

impl InMemoryStorage {
    /// Creates a new InMemoryStorage instance with an empty store.
    pub fn new() -> Self {
        Self::with_preferences(Preferences::new())
    }

    /// Creates a new InMemoryStorage instance seeded with `initial`.
    pub fn with_preferences(initial: Preferences) -> Self {
        let (data_tx, _) = watch::channel(initial);
        Self {
            data_tx,
            write_lock: Mutex::new(()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    fn data(&self) -> watch::Receiver<Preferences> {
        self.data_tx.subscribe()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn edit(&self, transform: Transform) -> StorageResult<Preferences> {
        let _guard = self.write_lock.lock().await;

        let current = self.data_tx.borrow().clone();
        let mut mutable = current.to_mutable();
        transform(&mut mutable);
        let updated = mutable.freeze();

        if updated != current {
            self.data_tx.send_replace(updated.clone());
        }
        Ok(updated)
    }

    async fn flush(&self) -> StorageResult<()> {
        // No-op for in-memory storage - all writes are immediately visible
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        // No-op for in-memory storage
        Ok(())
    }
}

/// Injected failure that fires either once or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(super::StorageError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(super::StorageError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once. For [`Failure::Persistent`], the slot is left
/// unchanged.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures into `edit` and `flush` on demand.
///
/// Failures can be *persistent* (returned on every call until cleared) or
/// *once* (returned on the next call, then automatically cleared). A failed
/// `edit` never reaches the inner storage, so nothing is committed.
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let inner = Arc::new(InMemoryStorage::new());
/// let storage = FailingStorage::wrap(inner);
/// storage.fail_edit(StorageError::Storage("disk full".into()));
/// // every edit call now returns Err(...)
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_edit: FailSlot,
    fail_flush: FailSlot,
}

#[cfg(feature = "test-utils")]
impl FailingStorage {
    /// Wraps an existing storage, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_edit: arc_swap::ArcSwap::from_pointee(None),
            fail_flush: arc_swap::ArcSwap::from_pointee(None),
        })
    }

    /// Makes `edit` return the given error on every subsequent call.
    pub fn fail_edit(&self, err: super::StorageError) {
        self.fail_edit.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `edit` return the given error on the next call only.
    pub fn fail_edit_once(&self, err: super::StorageError) {
        self.fail_edit.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `flush` return the given error on every subsequent call.
    pub fn fail_flush(&self, err: super::StorageError) {
        self.fail_flush.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Clears every injected failure.
    pub fn clear_failures(&self) {
        self.fail_edit.store(Arc::new(None));
        self.fail_flush.store(Arc::new(None));
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StorageRead for FailingStorage {
    fn data(&self) -> watch::Receiver<Preferences> {
        self.inner.data()
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl Storage for FailingStorage {
    async fn edit(&self, transform: Transform) -> StorageResult<Preferences> {
        check_failure(&self.fail_edit)?;
        self.inner.edit(transform).await
    }

    async fn flush(&self) -> StorageResult<()> {
        check_failure(&self.fail_flush)?;
        self.inner.flush().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}
