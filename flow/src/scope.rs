//! Execution scopes and sharing policies for state flows.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A cancellable execution context.
///
/// Tasks spawned through a scope run on its runtime and end as soon as the
/// scope (or any parent scope) is cancelled. Clones share the same
/// cancellation state.
#[derive(Clone, Debug)]
pub struct Scope {
    handle: Handle,
    token: CancellationToken,
}

impl Scope {
    /// Creates a scope on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Creates a scope spawning onto the given runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            token: CancellationToken::new(),
        }
    }

    /// Creates a child scope, cancelled together with this one but
    /// cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Spawns `task` onto the scope's runtime. The task is dropped at its next
    /// suspension point after the scope is cancelled.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = task => {}
            }
        })
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// When a state flow starts and stops collecting its upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharingStarted {
    /// Start immediately and never stop.
    Eagerly,
    /// Start on the first subscriber and never stop.
    Lazily,
    /// Start on the first subscriber; stop `stop_timeout` after the last one
    /// leaves, and start again on the next. The cached value is kept.
    WhileSubscribed { stop_timeout: Duration },
}

impl SharingStarted {
    /// `WhileSubscribed` that stops as soon as the last subscriber leaves.
    pub fn while_subscribed() -> Self {
        SharingStarted::WhileSubscribed {
            stop_timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_abort_spawned_task_on_cancel() {
        // given
        let scope = Scope::new();
        let handle = scope.spawn(futures::future::pending());

        // when
        scope.cancel();

        // then
        handle.await.unwrap();
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn should_cancel_child_with_parent() {
        // given
        let parent = Scope::new();
        let child = parent.child();

        // when
        parent.cancel();

        // then
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn should_not_cancel_parent_with_child() {
        // given
        let parent = Scope::new();
        let child = parent.child();

        // when
        child.cancel();

        // then
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
