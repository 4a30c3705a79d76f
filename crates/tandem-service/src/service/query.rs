//! Status and history of a branch.

use tracing::instrument;

use tandem_core::{Access, Caller, CommitRecord, ResourceId, Result};
use tandem_git::GitStatus;

use super::{GitSyncService, require_value};
use crate::metrics::observe;

impl GitSyncService {
    /// Compares the record's current state of `branch` with its last commit.
    #[instrument(skip_all, fields(root = %root_id, branch = %branch))]
    pub async fn get_status(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        branch: &str,
    ) -> Result<GitStatus> {
        observe("status", async {
            let branch = require_value(branch, "branch name")?;
            self.authorize(caller, root_id, Access::Read).await?;

            let resource = self.branch_resource(root_id, branch).await?;
            let target = self.target(resource)?;

            let _guard = self.locks.acquire(&target.path).await;
            let path = self.sync_worktree(&target).await?;
            self.executor.status(&path, &target.branch).await
        })
        .await
    }

    /// Returns the commits of `branch`, newest first.
    #[instrument(skip_all, fields(root = %root_id, branch = %branch))]
    pub async fn get_commit_history(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        branch: &str,
    ) -> Result<Vec<CommitRecord>> {
        observe("commit_history", async {
            let branch = require_value(branch, "branch name")?;
            self.authorize(caller, root_id, Access::Read).await?;

            let resource = self.branch_resource(root_id, branch).await?;
            let target = self.target(resource)?;

            let _guard = self.locks.acquire(&target.path).await;
            self.executor
                .commit_history(&target.path, &target.branch)
                .await
        })
        .await
    }
}
