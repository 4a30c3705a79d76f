//! Traits implemented by the collaborators the orchestration layer depends on.
//!
//! Persistence, authorization and the canonical serializer live outside this
//! workspace. The orchestration service only sees them through these seams.

use async_trait::async_trait;

use crate::artifact::ArtifactTree;
use crate::error::Result;
use crate::resource::Resource;
use crate::types::{Caller, ResourceId, WorkspaceId};

/// Why a resource is being exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportPurpose {
    /// Export for committing into a git worktree.
    VersionControl,
    /// Export for sharing outside version control.
    Sharing,
}

/// The access level an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Read-only operations (history, branch listing, metadata).
    Read,
    /// Operations that mutate the resource or its worktree.
    Write,
}

/// Converts resources to and from the canonical artifact tree.
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Exports the current state of `resource_id`.
    async fn export(&self, resource_id: &ResourceId, purpose: ExportPurpose)
    -> Result<ArtifactTree>;

    /// Imports `artifact` into the existing record `target`, replacing its
    /// content, and returns the refreshed record.
    async fn import(
        &self,
        workspace_id: &WorkspaceId,
        artifact: ArtifactTree,
        target: &ResourceId,
    ) -> Result<Resource>;
}

/// Persistence for resource records.
///
/// # Errors
///
/// Lookups return `Ok(None)` for missing records; the orchestration layer
/// decides which absences are errors.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Finds a record by id.
    async fn find(&self, id: &ResourceId) -> Result<Option<Resource>>;

    /// Finds the record representing `branch` of the lineage rooted at `root`.
    async fn find_branch(&self, root: &ResourceId, branch: &str) -> Result<Option<Resource>>;

    /// Returns every record of the lineage rooted at `root`, root included.
    async fn find_lineage(&self, root: &ResourceId) -> Result<Vec<Resource>>;

    /// Persists an existing record.
    async fn save(&self, resource: Resource) -> Result<Resource>;

    /// Persists a new record, assigning its id.
    async fn create(&self, resource: Resource) -> Result<Resource>;

    /// Promotes the edit-mode state of a record to its published view.
    async fn publish(&self, id: &ResourceId) -> Result<()>;
}

/// Gates public operations.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns an error if `caller` lacks `access` on `resource`.
    async fn authorize(&self, caller: &Caller, resource: &ResourceId, access: Access)
    -> Result<()>;
}
