//! Entries: a typed key bundled with the supplier of its default value.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::NaiveDateTime;
use common::Key;
use url::Url;

/// Produces a default value on demand.
pub type DefaultFn<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A key in the store together with the default used when the key holds no
/// (usable) value.
///
/// `E` is the type callers see and `S` the type the store holds under the
/// key. For plain entries both are the same.
///
/// Entries compare and hash by key name, so they can be used as map keys.
pub struct Entry<E, S = E> {
    key: Key<S>,
    default: DefaultFn<E>,
}

/// An entry whose value is persisted as a URI string.
pub type UriEntry = Entry<Option<Url>, String>;

/// An entry whose value is persisted as an ISO-8601 local date-time string.
pub type LocalDateTimeEntry = Entry<Option<NaiveDateTime>, String>;

/// An entry whose enum value is persisted as its ordinal.
pub type EnumEntry<E> = Entry<E, i32>;

impl<E, S> Entry<E, S> {
    pub fn new<F>(key: Key<S>, default: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self {
            key,
            default: Arc::new(default),
        }
    }

    /// Creates an entry whose default is a fixed value.
    pub fn with_default(key: Key<S>, default: E) -> Self
    where
        E: Clone + Send + Sync + 'static,
    {
        Self::new(key, move || default.clone())
    }

    pub fn key(&self) -> &Key<S> {
        &self.key
    }

    /// Evaluates the default supplier.
    pub fn default_value(&self) -> E {
        (self.default)()
    }

    pub(crate) fn default_fn(&self) -> DefaultFn<E> {
        Arc::clone(&self.default)
    }
}

impl<E, S> Clone for Entry<E, S> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            default: Arc::clone(&self.default),
        }
    }
}

impl<E, S> fmt::Debug for Entry<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("key", &self.key).finish()
    }
}

impl<E, S> PartialEq for Entry<E, S> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<E, S> Eq for Entry<E, S> {}

impl<E, S> Hash for Entry<E, S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
