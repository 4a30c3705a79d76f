//! # Tandem Git
//!
//! Git plumbing for keeping application definitions in sync with remote
//! repositories.
//!
//! ## Features
//!
//! - Clone, commit, push, pull, branch and merge through the system `git` CLI
//! - Branch listing, history and HEAD inspection with gix (pure Rust)
//! - Worktree materialization: artifact tree in, artifact tree out
//! - Per-worktree async locks and a bounded pool for blocking work
//! - SSH keys staged in private temporary files for one command at a time
//!
//! ## Example
//!
//! ```ignore
//! use tandem_git::{BlockingPool, GitExecutor, Materializer};
//! use tandem_core::GitProfile;
//!
//! let pool = BlockingPool::new(8);
//! let executor = GitExecutor::new(pool.clone(), GitProfile::new("Tandem", "tandem@localhost"));
//! let materializer = Materializer::new(pool);
//!
//! let path = materializer.materialize(&worktree, &artifact, "main").await?;
//! let outcome = executor.commit(&path, "main", "Update pages", &author).await?;
//! ```

pub mod pool;
pub mod repository;
pub mod sync;
pub mod worktree;

// Re-exports
pub use pool::{BlockingPool, DEFAULT_MAX_BLOCKING};
pub use repository::{
    CommitOutcome, ConflictKind, GitExecutor, GitStatus, MergeConflict, MergeOutcome, PullStatus,
};
pub use sync::{WorktreeGuard, WorktreeLocks};
pub use worktree::{Materializer, RetirePolicy, WorktreeLayout};

// Re-export tandem_core for consumers
pub use tandem_core;
