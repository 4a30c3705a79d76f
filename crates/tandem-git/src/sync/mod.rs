//! Coordination of concurrent work on shared worktrees.

mod locks;

pub use locks::{WorktreeGuard, WorktreeLocks};
