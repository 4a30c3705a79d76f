//! Bounded execution of blocking git and filesystem work.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use tandem_core::{GitSyncError, Result};

/// Default number of blocking operations allowed to run at once.
pub const DEFAULT_MAX_BLOCKING: usize = 8;

/// Runs blocking closures on tokio's blocking threads, at most
/// `max_concurrent` at a time.
///
/// Git commands and worktree writes block; they must never run on the
/// async worker threads.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl BlockingPool {
    /// Creates a pool allowing `max_concurrent` blocking operations.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Returns the configured bound.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Runs `task` once a permit is available.
    pub async fn run<T, F>(&self, action: &'static str, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| GitSyncError::internal(format!("Blocking pool closed: {}", e)))?;

        debug!("Running blocking git task: {}", action);

        tokio::task::spawn_blocking(task)
            .await
            .map_err(|e| GitSyncError::git_action(action, format!("task failed: {}", e)))?
    }
}

impl Default for BlockingPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOCKING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_value() {
        let pool = BlockingPool::new(2);
        let value = pool.run("test", || Ok(41 + 1)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_propagates_error() {
        let pool = BlockingPool::default();
        let err = pool
            .run::<(), _>("commit", || Err(GitSyncError::git_action("commit", "boom")))
            .await
            .unwrap_err();
        assert_eq!(err.action(), Some("commit"));
    }

    #[test]
    fn test_zero_is_clamped() {
        assert_eq!(BlockingPool::new(0).max_concurrent(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = BlockingPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pool.run("sleep", move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
