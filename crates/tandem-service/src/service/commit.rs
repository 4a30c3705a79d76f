//! Commit, push and pull.

use tracing::{info, instrument};

use tandem_core::{Access, Caller, GitSyncError, ResourceId, Result};
use tandem_git::{CommitOutcome, PullStatus};

use super::types::{CommitRequest, PullOutcome};
use super::{GitSyncService, require_value};
use crate::metrics::observe;

const NOTHING_TO_COMMIT: &str = "nothing to commit, working tree clean";

impl GitSyncService {
    /// Commits the current state of `branch` and optionally pushes it.
    ///
    /// Returns a human readable result: `Commit Result : <summary>`, and
    /// with `do_push` also `. Push Result : <summary>`.
    ///
    /// # Errors
    ///
    /// An unchanged worktree is `GitActionFailed("commit")` unless the
    /// request also pushes, in which case the push still runs.
    #[instrument(skip_all, fields(root = %root_id, branch = %branch))]
    pub async fn commit(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        branch: &str,
        request: CommitRequest,
    ) -> Result<String> {
        observe("commit", async {
            let branch = require_value(branch, "branch name")?;
            self.authorize(caller, root_id, Access::Write).await?;

            let message = request
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(self.settings.default_commit_message())
                .to_string();

            let resource = self.branch_resource(root_id, branch).await?;
            if request.do_push {
                self.resources.publish(&resource.id).await?;
            }

            let target = self.target(resource)?;
            let author = self.resolve_author(caller, &target.root_id).await?;
            let credential = if request.do_push {
                Some(self.credential_for(&target).await?)
            } else {
                None
            };

            let _guard = self.locks.acquire(&target.path).await;
            let path = self.sync_worktree(&target).await?;

            let mut result = String::from("Commit Result : ");
            match self
                .executor
                .commit(&path, &target.branch, &message, &author)
                .await?
            {
                CommitOutcome::Committed { summary, .. } => result.push_str(&summary),
                CommitOutcome::NothingToCommit if request.do_push => {
                    result.push_str(NOTHING_TO_COMMIT)
                },
                CommitOutcome::NothingToCommit => {
                    return Err(GitSyncError::git_action(
                        "commit",
                        format!("On branch {} {}", target.branch, NOTHING_TO_COMMIT),
                    ));
                },
            }

            if let Some(credential) = credential {
                let summary = self
                    .executor
                    .push(&path, &target.remote_url, &target.branch, &credential)
                    .await?;
                result.push_str(". Push Result : ");
                result.push_str(&summary);
            }

            info!("{}", result);
            Ok(result)
        })
        .await
    }

    /// Publishes `branch` and pushes its committed state to the remote.
    #[instrument(skip_all, fields(root = %root_id, branch = %branch))]
    pub async fn push(&self, caller: &Caller, root_id: &ResourceId, branch: &str) -> Result<String> {
        observe("push", async {
            let branch = require_value(branch, "branch name")?;
            self.authorize(caller, root_id, Access::Write).await?;

            let resource = self.branch_resource(root_id, branch).await?;
            self.resources.publish(&resource.id).await?;

            let target = self.target(resource)?;
            let credential = self.credential_for(&target).await?;

            let _guard = self.locks.acquire(&target.path).await;
            self.executor
                .push(&target.path, &target.remote_url, &target.branch, &credential)
                .await
        })
        .await
    }

    /// Pulls `branch` from the remote.
    ///
    /// The record's current state is written into the worktree first. When
    /// remote commits were merged, the merged tree is imported back into the
    /// record.
    ///
    /// # Errors
    ///
    /// A conflicting pull is `InvalidRepoState` naming the conflicting
    /// files; the merge is aborted and the record left unchanged.
    #[instrument(skip_all, fields(root = %root_id, branch = %branch))]
    pub async fn pull(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        branch: &str,
    ) -> Result<PullOutcome> {
        observe("pull", async {
            let branch = require_value(branch, "branch name")?;
            self.authorize(caller, root_id, Access::Write).await?;

            let resource = self.branch_resource(root_id, branch).await?;
            let target = self.target(resource)?;
            let credential = self.credential_for(&target).await?;

            let _guard = self.locks.acquire(&target.path).await;
            let path = self.sync_worktree(&target).await?;

            let status = self
                .executor
                .pull(&path, &target.remote_url, &target.branch, &credential)
                .await?;

            let resource = match &status {
                PullStatus::UpToDate => target.resource,
                PullStatus::FetchedAndMerged { summary } => {
                    let merged = self.materializer.reconstruct(&path, &target.branch).await?;
                    let resource = self
                        .serializer
                        .import(target.workspace(), merged, &target.resource.id)
                        .await?;
                    info!("Pulled {} into {}: {}", target.branch, resource.id, summary);
                    resource
                },
                PullStatus::Failed { conflicts, .. } if !conflicts.is_empty() => {
                    let files: Vec<&str> = conflicts.iter().map(|c| c.path.as_str()).collect();
                    return Err(GitSyncError::invalid_repo_state(format!(
                        "Merge conflicts found in {}. Please resolve them on the remote and pull again",
                        files.join(", ")
                    )));
                },
                PullStatus::Failed { detail, .. } => {
                    return Err(GitSyncError::git_action("pull", detail.clone()));
                },
            };

            Ok(PullOutcome { resource, status })
        })
        .await
    }
}
