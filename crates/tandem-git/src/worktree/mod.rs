//! Worktree layout and materialization.
//!
//! One worktree serves every branch of a lineage; the materializer switches
//! branches as it writes or reads.

mod layout;
mod materializer;
pub mod seed;

pub use layout::WorktreeLayout;
pub use materializer::{Materializer, RetirePolicy, validate_artifact_path};
pub use seed::{SEED_FILE, SEED_MESSAGE};
