//! Reactive values carrying a default and a save operation.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::{Error, Result};
use crate::flow::Flow;
use crate::scope::{Scope, SharingStarted};
use crate::state::StoreStateFlow;

/// Persists a new value; shared by a [`StoreFlow`] and the state flows
/// promoted from it.
pub type SaveFn<V> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A [`Flow`] over one persisted value, holding the value's default and a
/// save operation.
///
/// The default is what state flows promoted from this flow show until the
/// first real value arrives.
pub struct StoreFlow<V> {
    flow: Flow<V>,
    default: V,
    save: SaveFn<V>,
}

impl<V: Clone> Clone for StoreFlow<V> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            default: self.default.clone(),
            save: Arc::clone(&self.save),
        }
    }
}

impl<V> StoreFlow<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(flow: Flow<V>, default: V, save: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            flow,
            default,
            save: Arc::new(move |value| save(value).boxed()),
        }
    }

    pub fn flow(&self) -> &Flow<V> {
        &self.flow
    }

    /// Starts a new subscription to the underlying flow.
    pub fn subscribe(&self) -> BoxStream<'static, V> {
        self.flow.subscribe()
    }

    pub fn default(&self) -> &V {
        &self.default
    }

    /// Persists `value`. Completes once the backing store has committed it.
    pub async fn save(&self, value: V) -> Result<()> {
        (self.save)(value).await
    }
}

impl<V> StoreFlow<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Promotes this flow to a [`StoreStateFlow`] living in `scope`, seeded
    /// with this flow's default.
    pub fn state_in(&self, scope: &Scope, started: SharingStarted) -> StoreStateFlow<V> {
        self.state_in_with_default(scope, started, self.default.clone())
    }

    /// Promotes this flow to a [`StoreStateFlow`] seeded with `default`.
    pub fn state_in_with_default(
        &self,
        scope: &Scope,
        started: SharingStarted,
        default: V,
    ) -> StoreStateFlow<V> {
        StoreStateFlow::launch(
            self.flow.clone(),
            default.clone(),
            default,
            Arc::clone(&self.save),
            scope,
            started,
        )
    }

    /// Waits for the first real value, then promotes this flow to an eagerly
    /// started [`StoreStateFlow`] seeded with it.
    ///
    /// Returns [`Error::Cancelled`] if `scope` is cancelled before a value
    /// arrives.
    pub async fn state_in_with_initial(&self, scope: &Scope) -> Result<StoreStateFlow<V>> {
        let initial = tokio::select! {
            biased;
            _ = scope.cancelled() => return Err(Error::Cancelled),
            first = self.flow.first() => first.ok_or_else(|| {
                Error::Internal("flow completed without emitting a value".to_string())
            })?,
        };
        Ok(StoreStateFlow::launch(
            self.flow.clone(),
            initial,
            self.default.clone(),
            Arc::clone(&self.save),
            scope,
            SharingStarted::Eagerly,
        ))
    }

    /// Blocking form of [`state_in_with_initial`](Self::state_in_with_initial).
    ///
    /// Blocks the calling thread until the first value arrives or `scope` is
    /// cancelled. Call it from a plain thread (for example during start-up or
    /// inside `spawn_blocking`), never from an async task.
    pub fn state_in_blocking(&self, scope: &Scope) -> Result<StoreStateFlow<V>> {
        futures::executor::block_on(self.state_in_with_initial(scope))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::sync::watch;

    use super::*;

    fn watched(initial: i32) -> (Arc<watch::Sender<i32>>, StoreFlow<i32>) {
        let (tx, _) = watch::channel(initial);
        let tx = Arc::new(tx);
        let flow = Flow::from_watch(tx.subscribe());
        let save_tx = Arc::clone(&tx);
        let store_flow = StoreFlow::new(flow, -1, move |value| {
            let tx = Arc::clone(&save_tx);
            async move {
                tx.send_replace(value);
                Ok(())
            }
        });
        (tx, store_flow)
    }

    #[tokio::test]
    async fn should_pass_through_upstream_values() {
        // given
        let (tx, store_flow) = watched(1);
        let mut stream = store_flow.subscribe();
        assert_eq!(stream.next().await, Some(1));

        // when
        tx.send_replace(2);

        // then
        assert_eq!(stream.next().await, Some(2));
        assert_eq!(*store_flow.default(), -1);
    }

    #[tokio::test]
    async fn should_save_through_save_operation() {
        // given
        let (tx, store_flow) = watched(1);

        // when
        store_flow.save(42).await.unwrap();

        // then
        assert_eq!(*tx.borrow(), 42);
    }

    #[tokio::test]
    async fn should_seed_with_initial_value_when_waiting_for_first() {
        // given
        let (_tx, store_flow) = watched(7);
        let scope = Scope::new();

        // when
        let state = store_flow.state_in_with_initial(&scope).await.unwrap();

        // then
        assert_eq!(state.value(), 7);
        assert_eq!(*state.default(), -1);
    }

    #[tokio::test]
    async fn should_abandon_wait_for_first_value_when_cancelled() {
        // given
        let store_flow = StoreFlow::new(
            Flow::new(futures::stream::pending::<i32>),
            0,
            |_| async { Ok(()) },
        );
        let scope = Scope::new();
        let waiter = {
            let scope = scope.clone();
            tokio::spawn(async move { store_flow.state_in_with_initial(&scope).await.err() })
        };

        // when
        scope.cancel();

        // then
        let result = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Some(Error::Cancelled));
    }

    #[tokio::test]
    async fn should_report_cancelled_scope_even_when_value_is_ready() {
        // given
        let (_tx, store_flow) = watched(1);
        let scope = Scope::new();
        scope.cancel();

        // when
        let mut results = Vec::new();
        for _ in 0..64 {
            results.push(store_flow.state_in_with_initial(&scope).await.err());
        }

        // then
        assert!(results.iter().all(|r| *r == Some(Error::Cancelled)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_report_cancelled_scope_when_blocking() {
        // given
        let (_tx, store_flow) = watched(1);
        let scope = Scope::new();
        scope.cancel();

        // when
        let result =
            tokio::task::spawn_blocking(move || store_flow.state_in_blocking(&scope).err())
                .await
                .unwrap();

        // then
        assert_eq!(result, Some(Error::Cancelled));
    }

    #[tokio::test]
    async fn should_fail_when_flow_completes_without_value() {
        // given
        let store_flow = StoreFlow::new(
            Flow::new(futures::stream::empty::<i32>),
            0,
            |_| async { Ok(()) },
        );

        // when
        let result = store_flow.state_in_with_initial(&Scope::new()).await;

        // then
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_block_for_first_value_on_plain_thread() {
        // given
        let (_tx, store_flow) = watched(11);
        let scope = Scope::new();

        // when
        let state = tokio::task::spawn_blocking(move || store_flow.state_in_blocking(&scope))
            .await
            .unwrap()
            .unwrap();

        // then
        assert_eq!(state.value(), 11);
    }
}
