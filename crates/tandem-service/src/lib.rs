//! # Tandem Service
//!
//! Orchestration layer keeping database-resident application definitions in
//! sync with git remotes.
//!
//! ## Features
//!
//! - Connect a root resource to an empty remote and seed its worktree
//! - Commit, push and pull a branch through its resource record
//! - Branch records: create, checkout, list and merge
//! - Status and history queries
//! - Per-user commit author profiles
//! - Settings from `tandem.toml` and `TANDEM__*` environment variables
//! - Operation counters and durations through the `metrics` facade
//!
//! ## Example
//!
//! ```ignore
//! use tandem_service::{Collaborators, CommitRequest, GitSyncService, Settings};
//!
//! let service = GitSyncService::new(Settings::load()?, collaborators);
//! let result = service
//!     .commit(&caller, &root_id, "main", CommitRequest::new("Update pages").and_push())
//!     .await?;
//! ```

pub mod metrics;
pub mod service;
pub mod settings;
pub mod telemetry;

pub use service::{
    Collaborators, CommitRequest, ConnectRequest, GitSyncService, MetadataView, ProfileView,
    PullOutcome,
};
pub use settings::Settings;
