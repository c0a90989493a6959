//! Deferred work bound to the lifetime of a session.
//!
//! Every task spawned through a [`TaskScope`] is aborted when the scope is shut
//! down or dropped, so a delayed send or a scroll hint can never fire against a
//! session that no longer exists.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Default)]
pub struct TaskScope {
    tasks: Vec<JoinHandle<()>>,
    closed: bool,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` after `delay`, unless the scope is shut down first.
    ///
    /// Returns `false` (and drops `fut`) when the scope is already closed or when
    /// no tokio runtime is running on the calling thread.
    pub fn schedule<F>(&mut self, delay: Duration, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed {
            return false;
        }
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "no tokio runtime, deferred task dropped");
                return false;
            }
        };
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        }));
        true
    }

    /// Tasks scheduled and not yet finished.
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Abort everything still pending and refuse new work.
    pub fn shutdown(&mut self) {
        self.closed = true;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_task_fires_after_delay() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut scope = TaskScope::new();
        let h = hits.clone();
        scope.schedule(Duration::from_millis(300), async move {
            h.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut scope = TaskScope::new();
        let h = hits.clone();
        scope.schedule(Duration::from_millis(150), async move {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(scope.pending(), 1);
        scope.shutdown();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(scope.is_closed());
        assert!(!scope.schedule(Duration::ZERO, async {}));
    }

    #[test]
    fn test_schedule_outside_runtime_is_refused() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut scope = TaskScope::new();
        let h = hits.clone();
        let accepted = scope.schedule(Duration::ZERO, async move {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!accepted);
        assert_eq!(scope.pending(), 0);
        assert!(!scope.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let mut scope = TaskScope::new();
            let h = hits.clone();
            scope.schedule(Duration::from_millis(10), async move {
                h.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
