//! Mapping from lineages to worktree directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tandem_core::{GitSyncError, ResourceId, Result, WorkspaceId};

/// Resolves where a lineage's worktree lives.
///
/// Worktrees are laid out as `<root>/<workspace>/<root resource>/<repo>`.
///
/// ```
/// use tandem_git::worktree::WorktreeLayout;
/// use tandem_core::{ResourceId, WorkspaceId};
///
/// let layout = WorktreeLayout::new("/var/lib/tandem");
/// let path = layout
///     .path(&WorkspaceId::new("ws1"), &ResourceId::new("app1"), "inventory")
///     .unwrap();
/// assert_eq!(path, std::path::PathBuf::from("/var/lib/tandem/ws1/app1/inventory"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeLayout {
    root: PathBuf,
}

impl WorktreeLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory holding all worktrees.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the worktree path of a lineage.
    pub fn path(
        &self,
        workspace_id: &WorkspaceId,
        root_resource_id: &ResourceId,
        repo_name: &str,
    ) -> Result<PathBuf> {
        let workspace = checked_segment(workspace_id.as_str(), "workspace id")?;
        let resource = checked_segment(root_resource_id.as_str(), "default application id")?;
        let repo = checked_segment(repo_name, "repository name")?;

        Ok(self.root.join(workspace).join(resource).join(repo))
    }
}

fn checked_segment<'a>(segment: &'a str, name: &str) -> Result<&'a str> {
    let unsafe_segment = segment.trim().is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);

    if unsafe_segment {
        Err(GitSyncError::invalid_parameter(name))
    } else {
        Ok(segment)
    }
}
