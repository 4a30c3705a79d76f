//! Branch records: creation, checkout, listing and merging.

use tracing::{info, instrument};

use tandem_core::{Access, Caller, ExportPurpose, GitSyncError, Resource, ResourceId, Result};
use tandem_git::MergeOutcome;

use super::{GitSyncService, require_value};
use crate::metrics::observe;

impl GitSyncService {
    /// Creates a branch from `source_branch` and a record representing it.
    ///
    /// The actual branch name may differ from `new_branch`: characters git
    /// rejects are replaced and an existing name gets a numeric suffix. The
    /// new record shares the lineage and the root's credential reference,
    /// and starts with a copy of the source record's state.
    #[instrument(skip_all, fields(root = %root_id, source = %source_branch, branch = %new_branch))]
    pub async fn create_branch(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        source_branch: &str,
        new_branch: &str,
    ) -> Result<Resource> {
        observe("create_branch", async {
            let source_branch = require_value(source_branch, "source branch name")?;
            let new_branch = require_value(new_branch, "branch name")?;
            self.authorize(caller, root_id, Access::Write).await?;

            let source = self.branch_resource(root_id, source_branch).await?;
            let target = self.target(source)?;

            let actual = {
                let _guard = self.locks.acquire(&target.path).await;
                self.executor.checkout(&target.path, &target.branch).await?;
                self.executor
                    .create_and_checkout_branch(&target.path, new_branch)
                    .await?
            };

            let source = &target.resource;
            let metadata = source
                .git
                .as_ref()
                .map(|git| git.for_branch(&actual))
                .ok_or_else(|| GitSyncError::internal("source record lost its git metadata"))?;

            let mut record = Resource::new("", source.workspace_id.clone(), source.name.clone());
            record.default_page_id = source.default_page_id.clone();
            record.git = Some(metadata);
            let created = self.resources.create(record).await?;

            let artifact = self
                .serializer
                .export(&source.id, ExportPurpose::VersionControl)
                .await?;
            let created = self
                .serializer
                .import(target.workspace(), artifact, &created.id)
                .await?;

            info!(
                "Created branch {} from {} as {}",
                actual, target.branch, created.id
            );
            Ok(created)
        })
        .await
    }

    /// Checks out `branch` in the lineage's worktree and returns its record.
    #[instrument(skip_all, fields(root = %root_id, branch = %branch))]
    pub async fn checkout_branch(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        branch: &str,
    ) -> Result<Resource> {
        observe("checkout_branch", async {
            let branch = require_value(branch, "branch name")?;
            self.authorize(caller, root_id, Access::Read).await?;

            let resource = self.branch_resource(root_id, branch).await?;
            let target = self.target(resource)?;

            let _guard = self.locks.acquire(&target.path).await;
            self.executor.checkout(&target.path, &target.branch).await?;

            Ok(target.resource)
        })
        .await
    }

    /// Lists the local branches of the lineage, then the `origin/*` ones.
    #[instrument(skip_all, fields(root = %root_id))]
    pub async fn list_branches(&self, caller: &Caller, root_id: &ResourceId) -> Result<Vec<String>> {
        observe("list_branches", async {
            self.authorize(caller, root_id, Access::Read).await?;

            let root = self.load_root(root_id).await?;
            let target = self.target(root)?;

            let _guard = self.locks.acquire(&target.path).await;
            self.executor.list_branches(&target.path).await
        })
        .await
    }

    /// Merges `source_branch` into `destination_branch`.
    ///
    /// The destination record's state is written into the worktree first.
    /// After a successful merge the merged tree is imported back into the
    /// destination record. Conflicts are aborted and returned in the outcome.
    #[instrument(skip_all, fields(root = %root_id, source = %source_branch, destination = %destination_branch))]
    pub async fn merge_branch(
        &self,
        caller: &Caller,
        root_id: &ResourceId,
        source_branch: &str,
        destination_branch: &str,
    ) -> Result<MergeOutcome> {
        observe("merge", async {
            let source_branch = require_value(source_branch, "source branch name")?;
            let destination_branch = require_value(destination_branch, "destination branch name")?;
            if source_branch == destination_branch {
                return Err(GitSyncError::invalid_parameter("destination branch name"));
            }
            self.authorize(caller, root_id, Access::Write).await?;

            let destination = self.branch_resource(root_id, destination_branch).await?;
            let target = self.target(destination)?;

            let _guard = self.locks.acquire(&target.path).await;
            let path = self.sync_worktree(&target).await?;

            let outcome = self
                .executor
                .merge(&path, source_branch, &target.branch)
                .await?;

            if outcome.merged {
                let merged = self.materializer.reconstruct(&path, &target.branch).await?;
                self.serializer
                    .import(target.workspace(), merged, &target.resource.id)
                    .await?;
                info!("Merged {} into {}", source_branch, target.branch);
            } else {
                info!(
                    "Merging {} into {} stopped on {} conflicts",
                    source_branch,
                    target.branch,
                    outcome.conflicts.len()
                );
            }

            Ok(outcome)
        })
        .await
    }
}
