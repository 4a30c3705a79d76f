//! Resource records as seen by the orchestration layer.

use serde::{Deserialize, Serialize};

use crate::metadata::GitMetadata;
use crate::types::{ResourceId, WorkspaceId};

/// A versioned application record.
///
/// A root resource carries `git.root_resource_id == id`; a branch resource
/// points at its root. The application content itself is opaque here and is
/// only reachable through the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Record id. Empty until the store assigns one.
    pub id: ResourceId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Display name.
    pub name: String,
    /// Page opened by the generated view/edit links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_page_id: Option<String>,
    /// Git binding, absent while unconnected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitMetadata>,
}

impl Resource {
    /// Creates an unconnected resource.
    pub fn new(
        id: impl Into<ResourceId>,
        workspace_id: impl Into<WorkspaceId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
            name: name.into(),
            default_page_id: None,
            git: None,
        }
    }

    /// Returns true if this record is the root of its lineage.
    pub fn is_root(&self) -> bool {
        self.git
            .as_ref()
            .and_then(GitMetadata::root_resource_id)
            .is_some_and(|root| *root == self.id)
    }

    /// Returns the branch this record represents, if connected.
    pub fn branch_name(&self) -> Option<&str> {
        self.git.as_ref().and_then(GitMetadata::branch_name)
    }
}
