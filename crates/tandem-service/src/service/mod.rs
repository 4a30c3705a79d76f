//! The orchestration service.
//!
//! [`GitSyncService`] ties the collaborators together: it resolves a
//! `(root, branch)` pair to a resource record and a worktree, exports the
//! record through the [`Serializer`], materializes it and drives the
//! [`GitExecutor`]. Every sequence touching a worktree runs under that
//! worktree's lock.

mod branch;
mod commit;
mod connect;
mod profile;
mod query;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use tandem_core::{
    Access, Authorizer, Caller, CredentialStore, ExportPurpose, GitCredential, GitProfile,
    GitSyncError, ProfileStore, Resource, ResourceId, ResourceStore, Result, Serializer,
    WorkspaceId,
};
use tandem_git::{BlockingPool, GitExecutor, Materializer, WorktreeLayout, WorktreeLocks};

use crate::settings::Settings;

pub use types::{CommitRequest, ConnectRequest, MetadataView, ProfileView, PullOutcome};

/// External collaborators the service depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub resources: Arc<dyn ResourceStore>,
    pub serializer: Arc<dyn Serializer>,
    pub authorizer: Arc<dyn Authorizer>,
    pub credentials: Arc<dyn CredentialStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

/// Keeps resource records and their git worktrees in sync.
///
/// Cheap to clone; clones share the worktree locks and the blocking pool.
#[derive(Clone)]
pub struct GitSyncService {
    settings: Arc<Settings>,
    layout: WorktreeLayout,
    executor: GitExecutor,
    materializer: Materializer,
    locks: WorktreeLocks,
    resources: Arc<dyn ResourceStore>,
    serializer: Arc<dyn Serializer>,
    authorizer: Arc<dyn Authorizer>,
    credentials: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileStore>,
}

/// A connected record together with everything needed to reach its worktree.
struct Target {
    resource: Resource,
    path: PathBuf,
    remote_url: String,
    branch: String,
    root_id: ResourceId,
    credential_ref: ResourceId,
}

impl Target {
    fn workspace(&self) -> &WorkspaceId {
        &self.resource.workspace_id
    }
}

impl GitSyncService {
    /// Creates a service from settings and collaborators.
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        let pool = BlockingPool::new(settings.max_blocking_operations());

        Self {
            layout: WorktreeLayout::new(settings.worktree_root()),
            executor: GitExecutor::new(pool.clone(), settings.merge_author()),
            materializer: Materializer::new(pool),
            locks: WorktreeLocks::new(),
            settings: Arc::new(settings),
            resources: collaborators.resources,
            serializer: collaborators.serializer,
            authorizer: collaborators.authorizer,
            credentials: collaborators.credentials,
            profiles: collaborators.profiles,
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the worktree layout.
    pub fn layout(&self) -> &WorktreeLayout {
        &self.layout
    }

    async fn authorize(&self, caller: &Caller, resource: &ResourceId, access: Access) -> Result<()> {
        self.authorizer.authorize(caller, resource, access).await
    }

    async fn load_root(&self, root_id: &ResourceId) -> Result<Resource> {
        self.resources
            .find(root_id)
            .await?
            .ok_or_else(|| GitSyncError::not_found("application", root_id.as_str()))
    }

    /// Finds the record for `branch` of the lineage rooted at `root_id`.
    async fn branch_resource(&self, root_id: &ResourceId, branch: &str) -> Result<Resource> {
        self.resources
            .find_branch(root_id, branch)
            .await?
            .ok_or_else(|| {
                GitSyncError::not_found("application", format!("{} on branch {}", root_id, branch))
            })
    }

    fn target(&self, resource: Resource) -> Result<Target> {
        let (path, remote_url, branch, root_id, credential_ref) = {
            let synced = resource
                .git
                .as_ref()
                .ok_or_else(|| {
                    GitSyncError::invalid_configuration(
                        "Unable to find git configuration. Please reconfigure the application to connect to git repo",
                    )
                })?
                .require_complete()?;

            let path = self.layout.path(
                &resource.workspace_id,
                synced.root_resource_id,
                synced.repo_name,
            )?;

            (
                path,
                synced.remote_url.to_string(),
                synced.branch_name.to_string(),
                synced.root_resource_id.clone(),
                synced.credential_ref.clone(),
            )
        };

        Ok(Target {
            resource,
            path,
            remote_url,
            branch,
            root_id,
            credential_ref,
        })
    }

    async fn credential_for(&self, target: &Target) -> Result<GitCredential> {
        self.credentials
            .get_credential(&target.credential_ref)
            .await?
            .ok_or_else(|| {
                GitSyncError::invalid_credentials(
                    "Unable to find the SSH key of this application. Please generate a new key and reconnect",
                )
            })
    }

    /// The author for commits on the lineage `root_id`: the caller's
    /// override for the lineage, else their default profile.
    async fn resolve_author(&self, caller: &Caller, root_id: &ResourceId) -> Result<GitProfile> {
        self.profiles
            .get_profiles(caller.user_id())
            .await?
            .resolve(Some(root_id))
            .cloned()
            .ok_or_else(|| {
                GitSyncError::invalid_configuration(
                    "Unable to find git author configuration for logged-in user. You can set up a git profile from the user's profile section.",
                )
            })
    }

    /// Writes the current database state of the target into its worktree.
    /// The caller must hold the worktree lock.
    async fn sync_worktree(&self, target: &Target) -> Result<PathBuf> {
        let artifact = self
            .serializer
            .export(&target.resource.id, ExportPurpose::VersionControl)
            .await?;

        debug!(
            "Materializing {} files of {} on {}",
            artifact.len(),
            target.resource.id,
            target.branch
        );

        self.materializer
            .materialize(&target.path, &artifact, &target.branch)
            .await
    }
}

fn require_value<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GitSyncError::invalid_parameter(name));
    }
    Ok(value)
}
