//! Cold, re-subscribable streams.

use std::sync::Arc;

use futures::future;
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A cold stream of values.
///
/// A `Flow` is a factory: each call to [`subscribe`](Flow::subscribe) starts an
/// independent stream, so the same flow can be collected any number of times.
/// Cloning is cheap.
pub struct Flow<V> {
    source: Arc<dyn Fn() -> BoxStream<'static, V> + Send + Sync>,
}

impl<V> Clone for Flow<V> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<V: Send + 'static> Flow<V> {
    /// Creates a flow from a function producing a fresh stream per subscriber.
    pub fn new<F, S>(source: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = V> + Send + 'static,
    {
        Self {
            source: Arc::new(move || source().boxed()),
        }
    }

    /// Starts a new subscription.
    pub fn subscribe(&self) -> BoxStream<'static, V> {
        (self.source)()
    }

    /// Returns a flow emitting `f` applied to every value of this flow.
    pub fn map<U, F>(&self, f: F) -> Flow<U>
    where
        U: Send + 'static,
        F: Fn(V) -> U + Send + Sync + 'static,
    {
        let source = Arc::clone(&self.source);
        let f = Arc::new(f);
        Flow::new(move || {
            let f = Arc::clone(&f);
            source().map(move |value| f(value))
        })
    }

    /// Returns a flow emitting the `Some` results of `f`, skipping `None`s.
    pub fn filter_map<U, F>(&self, f: F) -> Flow<U>
    where
        U: Send + 'static,
        F: Fn(V) -> Option<U> + Send + Sync + 'static,
    {
        let source = Arc::clone(&self.source);
        let f = Arc::new(f);
        Flow::new(move || {
            let f = Arc::clone(&f);
            source().filter_map(move |value| future::ready(f(value)))
        })
    }

    /// Waits for the first value of a new subscription.
    ///
    /// Returns `None` if the stream completes without emitting.
    pub async fn first(&self) -> Option<V> {
        self.subscribe().next().await
    }
}

impl<V: Clone + Send + Sync + 'static> Flow<V> {
    /// Creates a flow over a `watch` channel.
    ///
    /// Each subscription emits the channel's current value first, then every
    /// subsequent change.
    pub fn from_watch(rx: watch::Receiver<V>) -> Self {
        Flow::new(move || WatchStream::new(rx.clone()))
    }
}
