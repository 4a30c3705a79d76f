//! Git repository operations.
//!
//! This module drives the system `git` binary for everything that changes a
//! repository and reads refs and history with gix.

mod command;
mod executor;
mod outcome;
mod refs;
mod ssh;

pub use executor::GitExecutor;
pub use outcome::{CommitOutcome, ConflictKind, GitStatus, MergeConflict, MergeOutcome, PullStatus};
pub use refs::{disambiguate, sanitize_branch_name, validate_branch_name};
pub use ssh::SshSession;
