//! Git metadata attached to a resource.

use serde::{Deserialize, Serialize};

use crate::error::{GitSyncError, Result};
use crate::types::ResourceId;

/// Binds a resource to its remote, branch and repository name.
///
/// Records come from the persistence layer, so every field may be absent;
/// [`GitMetadata::require_complete`] is the gate every git operation goes
/// through before touching a worktree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitMetadata {
    /// The root resource of the lineage.
    pub root_resource_id: Option<ResourceId>,
    /// Repository name derived from the remote url at connect time.
    pub repo_name: Option<String>,
    /// The remote url.
    pub remote_url: Option<String>,
    /// The branch this record represents.
    pub branch_name: Option<String>,
    /// Reference to the lineage's keypair in the credential store.
    pub credential_ref: Option<ResourceId>,
    /// Public half of the lineage's keypair.
    pub cached_public_key: Option<String>,
}

/// A borrowed view of metadata whose fields are all present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedMetadata<'a> {
    pub root_resource_id: &'a ResourceId,
    pub repo_name: &'a str,
    pub remote_url: &'a str,
    pub branch_name: &'a str,
    pub credential_ref: &'a ResourceId,
    pub cached_public_key: &'a str,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl GitMetadata {
    /// Creates the metadata persisted for a root resource on connect.
    pub fn for_root(
        root_resource_id: ResourceId,
        repo_name: impl Into<String>,
        remote_url: impl Into<String>,
        branch_name: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            credential_ref: Some(root_resource_id.clone()),
            root_resource_id: Some(root_resource_id),
            repo_name: Some(repo_name.into()),
            remote_url: Some(remote_url.into()),
            branch_name: Some(branch_name.into()),
            cached_public_key: Some(public_key.into()),
        }
    }

    /// Returns a copy of this metadata describing another branch of the
    /// same lineage. The credential reference still points at the root.
    pub fn for_branch(&self, branch_name: impl Into<String>) -> Self {
        Self {
            branch_name: Some(branch_name.into()),
            ..self.clone()
        }
    }

    /// Returns the branch name if set.
    pub fn branch_name(&self) -> Option<&str> {
        present(self.branch_name.as_deref())
    }

    /// Returns the root resource id if set.
    pub fn root_resource_id(&self) -> Option<&ResourceId> {
        self.root_resource_id.as_ref().filter(|id| !id.is_blank())
    }

    /// Validates that every field is populated.
    ///
    /// The error names the first missing field.
    ///
    /// ```
    /// use tandem_core::{GitMetadata, ResourceId};
    ///
    /// let mut meta = GitMetadata::for_root(
    ///     ResourceId::new("app"), "repo", "git@host:o/repo.git", "main", "ssh-ed25519 AAAA",
    /// );
    /// assert!(meta.require_complete().is_ok());
    ///
    /// meta.repo_name = None;
    /// let err = meta.require_complete().unwrap_err();
    /// assert!(err.to_string().contains("repository name"));
    /// ```
    pub fn require_complete(&self) -> Result<SyncedMetadata<'_>> {
        let missing = |field: &str| {
            GitSyncError::invalid_configuration(format!(
                "Unable to find {}. Please reconfigure the application to connect to git repo",
                field
            ))
        };

        let root_resource_id = self
            .root_resource_id()
            .ok_or_else(|| missing("default application"))?;
        let branch_name = self.branch_name().ok_or_else(|| missing("branch name"))?;
        let repo_name =
            present(self.repo_name.as_deref()).ok_or_else(|| missing("repository name"))?;
        let remote_url =
            present(self.remote_url.as_deref()).ok_or_else(|| missing("remote url"))?;
        let credential_ref = self
            .credential_ref
            .as_ref()
            .filter(|id| !id.is_blank())
            .ok_or_else(|| missing("credential reference"))?;
        let cached_public_key =
            present(self.cached_public_key.as_deref()).ok_or_else(|| missing("public key"))?;

        Ok(SyncedMetadata {
            root_resource_id,
            repo_name,
            remote_url,
            branch_name,
            credential_ref,
            cached_public_key,
        })
    }

    /// Returns true when every field is populated.
    pub fn is_complete(&self) -> bool {
        self.require_complete().is_ok()
    }
}

/// Derives the repository name from a remote url.
///
/// The name is the final path segment before a `.git` suffix; special
/// characters are kept as the hosting provider reports them.
///
/// ```
/// use tandem_core::repo_name_from_url;
///
/// assert_eq!(repo_name_from_url("git@github.com:user/app.git").unwrap(), "app");
/// assert_eq!(repo_name_from_url("ssh://git@host/ws/app.git").unwrap(), "app");
/// assert!(repo_name_from_url("git@github.com:user/app").is_err());
/// ```
pub fn repo_name_from_url(remote_url: &str) -> Result<String> {
    let invalid = || {
        GitSyncError::invalid_configuration(
            "Remote URL is incorrect! Please provide it as per standard format => git@github.com:username/reponame.git",
        )
    };

    let stem = remote_url.trim().strip_suffix(".git").ok_or_else(invalid)?;
    let name = stem.rsplit('/').next().unwrap_or(stem);

    if name.is_empty() {
        return Err(invalid());
    }

    Ok(name.to_string())
}
