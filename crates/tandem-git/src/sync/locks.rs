//! Per-worktree mutual exclusion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Serializes operations against the same worktree.
///
/// All branches of a lineage share one checkout, so the lock is keyed by
/// the worktree path: a materialize/commit pair for one branch can never
/// interleave with a checkout, pull or commit for any branch of the same
/// lineage. Different lineages proceed in parallel.
#[derive(Debug, Default, Clone)]
pub struct WorktreeLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

/// Holds a worktree lock until dropped.
#[derive(Debug)]
pub struct WorktreeGuard {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl WorktreeGuard {
    /// Returns the locked worktree path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorktreeLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the worktree at `path`.
    pub async fn acquire(&self, path: &Path) -> WorktreeGuard {
        let lock = {
            let mut table = self.inner.lock();
            // Entries only referenced by the table are idle.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                table
                    .entry(path.to_path_buf())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        debug!("Waiting for worktree lock on {:?}", path);
        let guard = lock.lock_owned().await;

        WorktreeGuard {
            path: path.to_path_buf(),
            _guard: guard,
        }
    }

    /// Returns the number of worktrees currently tracked.
    pub fn tracked(&self) -> usize {
        self.inner.lock().len()
    }
}
