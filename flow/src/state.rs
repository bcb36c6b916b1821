//! Cached, scope-bound state holders promoted from [`StoreFlow`](crate::StoreFlow)s.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{Notify, watch};
use tokio_stream::wrappers::WatchStream;

use crate::error::Result;
use crate::flow::Flow;
use crate::scope::{Scope, SharingStarted};
use crate::store_flow::SaveFn;

/// The cached value cell shared between a [`StoreStateFlow`] and the task
/// feeding it.
struct StateCell<V> {
    value_tx: watch::Sender<V>,
    subscribed: Notify,
}

impl<V: PartialEq> StateCell<V> {
    /// Stores `value`, notifying subscribers only if it differs from the
    /// cached one.
    fn publish(&self, value: V) {
        self.value_tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    async fn wait_for_subscriber(&self) {
        while self.value_tx.receiver_count() == 0 {
            self.subscribed.notified().await;
        }
    }

    /// Completes once there have been no subscribers for `stop_timeout`.
    async fn idle(&self, stop_timeout: Duration) {
        loop {
            self.value_tx.closed().await;
            tokio::time::sleep(stop_timeout).await;
            if self.value_tx.receiver_count() == 0 {
                return;
            }
        }
    }
}

/// A cached "current value" of a [`StoreFlow`](crate::StoreFlow).
///
/// The cell is seeded with a default and then follows the upstream flow
/// while the sharing policy keeps it started. Equal consecutive values are
/// conflated. The feeding task lives exactly as long as the [`Scope`] it was
/// launched in; dropping every handle does not stop it.
pub struct StoreStateFlow<V> {
    cell: Arc<StateCell<V>>,
    default: V,
    save: SaveFn<V>,
}

impl<V: Clone> Clone for StoreStateFlow<V> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            default: self.default.clone(),
            save: Arc::clone(&self.save),
        }
    }
}

impl<V> StoreStateFlow<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn launch(
        upstream: Flow<V>,
        initial: V,
        default: V,
        save: SaveFn<V>,
        scope: &Scope,
        started: SharingStarted,
    ) -> Self {
        let (value_tx, _) = watch::channel(initial);
        let cell = Arc::new(StateCell {
            value_tx,
            subscribed: Notify::new(),
        });
        scope.spawn(share(Arc::clone(&cell), upstream, started));
        Self {
            cell,
            default,
            save,
        }
    }

    /// Returns the cached value.
    pub fn value(&self) -> V {
        self.cell.value_tx.borrow().clone()
    }

    /// Subscribes to the cached value. Counts as a subscriber for the
    /// sharing policy until the receiver is dropped.
    pub fn subscribe(&self) -> watch::Receiver<V> {
        let rx = self.cell.value_tx.subscribe();
        self.cell.subscribed.notify_one();
        rx
    }

    /// Subscribes and returns the cached value followed by every change.
    pub fn stream(&self) -> BoxStream<'static, V> {
        WatchStream::new(self.subscribe()).boxed()
    }

    /// Returns a flow whose subscriptions are [`stream`](Self::stream)s of this
    /// state.
    pub fn as_flow(&self) -> Flow<V> {
        let state = self.clone();
        Flow::new(move || state.stream())
    }

    pub fn default(&self) -> &V {
        &self.default
    }

    /// Persists `value` through the originating flow's save operation.
    pub async fn save(&self, value: V) -> Result<()> {
        (self.save)(value).await
    }
}

/// Feeds `cell` from `upstream` according to `started`.
async fn share<V>(cell: Arc<StateCell<V>>, upstream: Flow<V>, started: SharingStarted)
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    match started {
        SharingStarted::Eagerly => collect(&cell, &upstream).await,
        SharingStarted::Lazily => {
            cell.wait_for_subscriber().await;
            collect(&cell, &upstream).await;
        }
        SharingStarted::WhileSubscribed { stop_timeout } => loop {
            cell.wait_for_subscriber().await;
            tracing::debug!("state flow subscribed, starting upstream");

            let mut stream = upstream.subscribe();
            let idle = cell.idle(stop_timeout);
            tokio::pin!(idle);
            let completed = loop {
                tokio::select! {
                    item = stream.next() => match item {
                        Some(value) => cell.publish(value),
                        None => break true,
                    },
                    _ = &mut idle => break false,
                }
            };
            if completed {
                return;
            }
            tracing::debug!("state flow unsubscribed, stopped upstream");
        },
    }
}

async fn collect<V>(cell: &StateCell<V>, upstream: &Flow<V>)
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    let mut stream = upstream.subscribe();
    while let Some(value) = stream.next().await {
        cell.publish(value);
    }
}
