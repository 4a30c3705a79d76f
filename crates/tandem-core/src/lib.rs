//! Tandem Core - Domain types and traits
//!
//! This crate provides the foundational types for keeping a database-resident
//! application definition in sync with a git worktree: the git metadata
//! record, credentials and author profiles, the canonical artifact tree, the
//! error taxonomy, and the traits implemented by external collaborators.

pub mod artifact;
pub mod credentials;
pub mod error;
pub mod metadata;
pub mod ports;
pub mod profile;
pub mod resource;
pub mod types;

pub use artifact::ArtifactTree;
pub use credentials::{CredentialStore, GitCredential, InMemoryCredentialStore, SecretKey};
pub use error::{GitSyncError, Result};
pub use metadata::{GitMetadata, SyncedMetadata, repo_name_from_url};
pub use ports::{Access, Authorizer, ExportPurpose, ResourceStore, Serializer};
pub use profile::{GitProfile, InMemoryProfileStore, ProfileSet, ProfileStore};
pub use resource::Resource;
pub use types::{Caller, CommitRecord, ResourceId, UserId, WorkspaceId};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
