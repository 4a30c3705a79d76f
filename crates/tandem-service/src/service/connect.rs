//! Connecting, disconnecting and describing a lineage.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use tandem_core::{
    Access, Caller, GitMetadata, GitProfile, GitSyncError, Resource, ResourceId, Result,
    repo_name_from_url,
};
use tandem_git::RetirePolicy;
use tandem_git::worktree::SEED_MESSAGE;

use super::types::{ConnectRequest, MetadataView, ProfileView};
use super::{GitSyncService, require_value};
use crate::metrics::observe;

/// Page used in the seed links when the root has no default page.
const FALLBACK_PAGE: &str = "defaultPage";

impl GitSyncService {
    /// Connects the root resource `root_id` to an empty remote.
    ///
    /// The root's keypair must already be in the credential store. The
    /// remote is cloned into the lineage's worktree, the metadata is
    /// persisted with the remote's default branch and the seed document is
    /// committed as the caller, so the default branch always has a commit
    /// to branch from. If seeding fails, the metadata is cleared and the
    /// clone removed again.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for a blank remote url or origin
    /// - `InvalidGitCredentials` when the root has no usable keypair
    /// - `InvalidGitConfiguration` when the url has no `.git` suffix or the
    ///   caller has no author profile
    /// - `InvalidRepoState` when the worktree or the remote is not empty
    #[instrument(skip_all, fields(root = %root_id))]
    pub async fn connect(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        request: ConnectRequest,
    ) -> Result<Resource> {
        observe("connect", async {
            if root_id.is_blank() {
                return Err(GitSyncError::invalid_parameter("default application id"));
            }
            let remote_url = require_value(&request.remote_url, "remote url")?;
            let origin = require_value(&request.origin_header, "origin")?.trim_end_matches('/');

            self.authorize(caller, root_id, Access::Write).await?;

            if let Some(profile) = request.profile.clone() {
                self.store_profile(caller, profile, request.default_profile, Some(root_id))
                    .await?;
            }

            let mut root = self.load_root(root_id).await?;
            let credential = self
                .credentials
                .get_credential(root_id)
                .await?
                .ok_or_else(|| {
                    GitSyncError::invalid_credentials(
                        "Unable to find the SSH key of this application. Please generate a key before connecting",
                    )
                })?;
            credential.validate()?;
            let author = self.resolve_author(caller, root_id).await?;

            let repo_name = repo_name_from_url(remote_url)?;
            let path = self.layout.path(&root.workspace_id, root_id, &repo_name)?;
            let _guard = self.locks.acquire(&path).await;

            if !self.materializer.is_empty(&path).await? {
                return Err(GitSyncError::invalid_repo_state(format!(
                    "Unable to clone into {:?}: the directory is not empty",
                    path
                )));
            }
            // a leftover `.git` would make the clone fail
            self.materializer.retire(&path, RetirePolicy::Delete).await?;

            let default_branch = self
                .executor
                .clone_repository(&path, remote_url, &credential)
                .await?;

            if !self.materializer.is_empty(&path).await? {
                self.materializer.retire(&path, RetirePolicy::Delete).await?;
                return Err(GitSyncError::invalid_repo_state(
                    "The remote repository is not empty. Please connect to an empty repository",
                ));
            }

            root.git = Some(GitMetadata::for_root(
                root_id.clone(),
                &repo_name,
                remote_url,
                &default_branch,
                credential.public_key(),
            ));
            let root = self.resources.save(root).await?;

            let page = root.default_page_id.as_deref().unwrap_or(FALLBACK_PAGE);
            let view_url = format!("{}/{}/applications/pages/{}", origin, root_id, page);
            let edit_url = format!("{}/edit", view_url);

            let seeded = self
                .seed_repository(&path, &default_branch, &view_url, &edit_url, &author)
                .await;
            if let Err(e) = seeded {
                warn!("Seeding the repository failed, rolling back: {}", e);

                let mut rolled_back = root;
                rolled_back.git = None;
                if let Err(cleanup) = self.resources.save(rolled_back).await {
                    warn!("Clearing git metadata of {} failed: {}", root_id, cleanup);
                }
                if let Err(cleanup) = self.materializer.retire(&path, RetirePolicy::Delete).await {
                    warn!("Removing worktree {:?} failed: {}", path, cleanup);
                }

                return Err(e);
            }

            info!(
                "Connected {} to {} on branch {}",
                root_id, remote_url, default_branch
            );
            Ok(root)
        })
        .await
    }

    /// Writes the seed document and commits it on `branch`.
    /// The caller must hold the worktree lock.
    async fn seed_repository(
        &self,
        path: &Path,
        branch: &str,
        view_url: &str,
        edit_url: &str,
        author: &GitProfile,
    ) -> Result<()> {
        self.materializer.bootstrap(path, view_url, edit_url).await?;
        let outcome = self
            .executor
            .commit(path, branch, SEED_MESSAGE, author)
            .await?;

        debug!("Seeded {:?} on {}: {:?}", path, branch, outcome.hash());
        Ok(())
    }

    /// Disconnects the lineage rooted at `root_id`.
    ///
    /// Retires the worktree according to the configured policy and clears
    /// the git metadata of the root and every branch record. Unconnected
    /// resources are returned unchanged.
    #[instrument(skip_all, fields(root = %root_id))]
    pub async fn disconnect(&self, caller: &Caller, root_id: &ResourceId) -> Result<Resource> {
        observe("disconnect", async {
            self.authorize(caller, root_id, Access::Write).await?;

            let root = self.load_root(root_id).await?;
            let Some(git) = root.git.as_ref() else {
                return Ok(root);
            };
            if !root.is_root() {
                return Err(GitSyncError::invalid_parameter("default application id"));
            }

            let path = match git.repo_name.as_deref() {
                Some(repo) if !repo.trim().is_empty() => {
                    Some(self.layout.path(&root.workspace_id, root_id, repo)?)
                },
                _ => None,
            };
            let _guard = match &path {
                Some(path) => Some(self.locks.acquire(path).await),
                None => None,
            };

            if let Some(path) = &path {
                self.materializer
                    .retire(path, self.settings.retire_policy())
                    .await?;
            }

            let mut disconnected = root;
            for mut record in self.resources.find_lineage(root_id).await? {
                record.git = None;
                let saved = self.resources.save(record).await?;
                if saved.id == *root_id {
                    disconnected = saved;
                }
            }
            disconnected.git = None;

            info!("Disconnected {} from git", root_id);
            Ok(disconnected)
        })
        .await
    }

    /// Returns the git metadata of the root resource `root_id`, or `None`
    /// when it is not connected.
    #[instrument(skip_all, fields(root = %root_id))]
    pub async fn get_metadata(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
    ) -> Result<Option<MetadataView>> {
        observe("get_metadata", async {
            self.authorize(caller, root_id, Access::Read).await?;

            let root = self.load_root(root_id).await?;
            let Some(metadata) = root.git.as_ref() else {
                return Ok(None);
            };
            if !root.is_root() {
                return Err(GitSyncError::invalid_parameter("default application id"));
            }
            let public_key = metadata.require_complete()?.cached_public_key.to_string();

            let mut profiles = self.profiles.get_profiles(caller.user_id()).await?;
            let profiles = ProfileView {
                lineage: profiles.overrides.remove(root_id),
                default: profiles.default,
            };

            Ok(Some(MetadataView {
                metadata: metadata.clone(),
                public_key,
                profiles,
            }))
        })
        .await
    }
}
