//! Git operations against a lineage worktree.

use std::path::Path;

use chrono::{DateTime, Utc};
use gix::bstr::ByteSlice;
use tracing::{debug, info, warn};

use tandem_core::{CommitRecord, GitCredential, GitProfile, GitSyncError, Result};

use super::command::{GitCommand, classify_failure};
use super::outcome::{
    CommitOutcome, GitStatus, MergeConflict, MergeOutcome, PullStatus, conflicts_from_porcelain,
};
use super::refs::{disambiguate, sanitize_branch_name, validate_branch_name};
use super::ssh::SshSession;
use crate::pool::BlockingPool;

const STATUS_ARGS: [&str; 4] = [
    "status",
    "--porcelain=v1",
    "--untracked-files=all",
    "--no-renames",
];

/// Drives git against worktrees.
///
/// Every operation names the worktree and, where it matters, the branch it
/// applies to. Mutating operations use the `git` binary; branch listing,
/// history and HEAD inspection are read with gix. All work runs on the
/// bounded [`BlockingPool`].
///
/// Callers serialize access to a worktree themselves (see
/// [`WorktreeLocks`](crate::sync::WorktreeLocks)).
#[derive(Debug, Clone)]
pub struct GitExecutor {
    pool: BlockingPool,
    merge_identity: GitProfile,
}

impl GitExecutor {
    /// Creates an executor. `merge_identity` signs merge commits created
    /// by [`pull`](Self::pull) and [`merge`](Self::merge).
    pub fn new(pool: BlockingPool, merge_identity: GitProfile) -> Self {
        Self {
            pool,
            merge_identity,
        }
    }

    /// Returns the blocking pool.
    pub fn pool(&self) -> &BlockingPool {
        &self.pool
    }

    /// Returns the identity used for merge commits.
    pub fn merge_identity(&self) -> &GitProfile {
        &self.merge_identity
    }

    /// Clones `remote_url` into `path` and returns the remote's default branch.
    pub async fn clone_repository(
        &self,
        path: &Path,
        remote_url: &str,
        credential: &GitCredential,
    ) -> Result<String> {
        let path = path.to_path_buf();
        let remote_url = remote_url.to_string();
        let credential = credential.clone();

        info!("Cloning repository from {} to {:?}", remote_url, path);

        let branch = self
            .pool
            .run("clone", move || {
                Self::clone_blocking(&path, &remote_url, &credential)
            })
            .await?;

        info!("Repository cloned, default branch is {}", branch);
        Ok(branch)
    }

    fn clone_blocking(path: &Path, remote_url: &str, credential: &GitCredential) -> Result<String> {
        let parent = path
            .parent()
            .ok_or_else(|| GitSyncError::invalid_parameter("worktree path"))?;
        std::fs::create_dir_all(parent)?;

        let session = SshSession::open(credential)?;
        GitCommand::new("clone", parent)
            .remote(&session)
            .args(["clone", "-q", "--", remote_url])
            .arg(path.as_os_str())
            .run()?;

        Self::current_branch_blocking(path)?.ok_or_else(|| {
            GitSyncError::git_action("clone", "remote HEAD does not point at a branch")
        })
    }

    /// Creates a branch from the checked-out one and switches to it.
    ///
    /// The requested name is sanitized and, if taken, suffixed with `-1`,
    /// `-2`, ... Returns the name actually created. A checked-out branch
    /// without commits cannot be branched from (`InvalidRepoState`).
    pub async fn create_and_checkout_branch(&self, path: &Path, requested: &str) -> Result<String> {
        let path = path.to_path_buf();
        let requested = requested.to_string();

        let branch = self
            .pool
            .run("branch", move || {
                Self::create_branch_blocking(&path, &requested)
            })
            .await?;

        info!("Created branch {}", branch);
        Ok(branch)
    }

    fn create_branch_blocking(path: &Path, requested: &str) -> Result<String> {
        let base = sanitize_branch_name(requested)?;
        if !Self::head_is_born(path)? {
            let source = Self::current_branch_blocking(path)?;
            return Err(GitSyncError::invalid_repo_state(format!(
                "git branch: '{}' has no commits to branch from",
                source.unwrap_or_else(|| "HEAD".to_string())
            )));
        }

        let repo = Self::open_repo(path, "branch")?;
        let branch = disambiguate(&base, |name| Self::local_branch_exists(&repo, name));

        GitCommand::new("branch", path)
            .args(["checkout", "-q", "-b", branch.as_str()])
            .run()?;

        Ok(branch)
    }

    /// Switches the worktree to an existing local branch.
    pub async fn checkout(&self, path: &Path, branch: &str) -> Result<()> {
        let path = path.to_path_buf();
        let branch = branch.to_string();

        self.pool
            .run("checkout", move || Self::switch_branch_blocking(&path, &branch))
            .await
    }

    /// Stages everything and commits it on `branch` as `author`.
    pub async fn commit(
        &self,
        path: &Path,
        branch: &str,
        message: &str,
        author: &GitProfile,
    ) -> Result<CommitOutcome> {
        let path = path.to_path_buf();
        let branch = branch.to_string();
        let message = message.to_string();
        let author = author.clone();

        let outcome = self
            .pool
            .run("commit", move || {
                Self::commit_blocking(&path, &branch, &message, &author)
            })
            .await?;

        match &outcome {
            CommitOutcome::Committed { summary, .. } => info!("Committed {}", summary),
            CommitOutcome::NothingToCommit => debug!("Nothing to commit"),
        }
        Ok(outcome)
    }

    fn commit_blocking(
        path: &Path,
        branch: &str,
        message: &str,
        author: &GitProfile,
    ) -> Result<CommitOutcome> {
        Self::require_on_branch(path, branch, "commit")?;

        GitCommand::new("commit", path).args(["add", "-A"]).run()?;

        let pending = GitCommand::new("commit", path).args(STATUS_ARGS).run()?;
        if pending.trim().is_empty() {
            return Ok(CommitOutcome::NothingToCommit);
        }

        GitCommand::new("commit", path)
            .identity(&author.author_name, &author.author_email)
            .args(["commit", "-q", "--no-verify", "-m", message])
            .run()?;

        let hash = GitCommand::new("commit", path)
            .args(["rev-parse", "HEAD"])
            .run()?
            .trim()
            .to_string();
        let short = hash.get(..7).unwrap_or(&hash);
        let title = message.lines().next().unwrap_or_default();
        let summary = format!("[{} {}] {}", branch, short, title);

        Ok(CommitOutcome::Committed { hash, summary })
    }

    /// Pushes `branch` to `remote_url` and returns git's per-ref summary.
    pub async fn push(
        &self,
        path: &Path,
        remote_url: &str,
        branch: &str,
        credential: &GitCredential,
    ) -> Result<String> {
        let path = path.to_path_buf();
        let remote_url = remote_url.to_string();
        let branch = branch.to_string();
        let credential = credential.clone();

        let summary = self
            .pool
            .run("push", move || {
                Self::push_blocking(&path, &remote_url, &branch, &credential)
            })
            .await?;

        info!("Pushed: {}", summary);
        Ok(summary)
    }

    fn push_blocking(
        path: &Path,
        remote_url: &str,
        branch: &str,
        credential: &GitCredential,
    ) -> Result<String> {
        validate_branch_name(branch)?;
        let repo = Self::open_repo(path, "push")?;
        if !Self::local_branch_exists(&repo, branch) {
            return Err(GitSyncError::git_action(
                "push",
                format!("branch '{}' has no commits", branch),
            ));
        }

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        let session = SshSession::open(credential)?;
        let output = GitCommand::new("push", path)
            .remote(&session)
            .args(["push", "--porcelain", remote_url, refspec.as_str()])
            .output()?;

        if !output.success {
            return Err(classify_failure("push", true, &output.combined()));
        }

        Ok(push_summary(&output.stdout))
    }

    /// Fetches `branch` from `remote_url` and merges it into the local branch.
    ///
    /// A conflicting merge is aborted before returning
    /// [`PullStatus::Failed`], leaving the worktree as it was.
    pub async fn pull(
        &self,
        path: &Path,
        remote_url: &str,
        branch: &str,
        credential: &GitCredential,
    ) -> Result<PullStatus> {
        let path = path.to_path_buf();
        let remote_url = remote_url.to_string();
        let branch = branch.to_string();
        let credential = credential.clone();
        let identity = self.merge_identity.clone();

        let status = self
            .pool
            .run("pull", move || {
                Self::pull_blocking(&path, &remote_url, &branch, &credential, &identity)
            })
            .await?;

        match &status {
            PullStatus::UpToDate => debug!("Pull found nothing new"),
            PullStatus::FetchedAndMerged { summary } => info!("Pulled: {}", summary),
            PullStatus::Failed { detail, conflicts } => {
                warn!("Pull failed with {} conflicts: {}", conflicts.len(), detail)
            },
        }
        Ok(status)
    }

    fn pull_blocking(
        path: &Path,
        remote_url: &str,
        branch: &str,
        credential: &GitCredential,
        identity: &GitProfile,
    ) -> Result<PullStatus> {
        Self::require_on_branch(path, branch, "pull")?;
        let remote_ref = format!("refs/heads/{}", branch);

        {
            let session = SshSession::open(credential)?;
            let listed = GitCommand::new("pull", path)
                .remote(&session)
                .args(["ls-remote", "--exit-code", "--heads", remote_url, remote_ref.as_str()])
                .output()?;
            if !listed.success {
                // 2: the remote has no such branch, so there is nothing to fetch
                if listed.code == Some(2) {
                    return Ok(PullStatus::UpToDate);
                }
                return Err(classify_failure("pull", true, &listed.combined()));
            }

            GitCommand::new("pull", path)
                .remote(&session)
                .args(["fetch", "-q", remote_url, remote_ref.as_str()])
                .run()?;
        }

        if Self::head_is_born(path)? {
            let merged = GitCommand::new("pull", path)
                .args(["merge-base", "--is-ancestor", "FETCH_HEAD", "HEAD"])
                .output()?;
            if merged.success {
                return Ok(PullStatus::UpToDate);
            }
        }

        let output = GitCommand::new("pull", path)
            .identity(&identity.author_name, &identity.author_email)
            .args(["merge", "--no-edit", "FETCH_HEAD"])
            .output()?;

        if output.success {
            let summary = output
                .stdout
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with("Updating"))
                .unwrap_or("Merged")
                .to_string();
            return Ok(PullStatus::FetchedAndMerged { summary });
        }

        let conflicts = Self::conflicts_blocking(path)?;
        if !conflicts.is_empty() {
            Self::abort_merge(path, "pull")?;
        }

        Ok(PullStatus::Failed {
            detail: output.combined(),
            conflicts,
        })
    }

    /// Reports uncommitted changes on `branch`.
    pub async fn status(&self, path: &Path, branch: &str) -> Result<GitStatus> {
        let path = path.to_path_buf();
        let branch = branch.to_string();

        self.pool
            .run("status", move || Self::status_blocking(&path, &branch))
            .await
    }

    fn status_blocking(path: &Path, branch: &str) -> Result<GitStatus> {
        Self::switch_branch_blocking(path, branch)?;
        let output = GitCommand::new("status", path).args(STATUS_ARGS).run()?;
        Ok(GitStatus::from_porcelain(&output))
    }

    /// Reports uncommitted changes without touching the worktree.
    ///
    /// Fails unless `branch` is already checked out, so it is safe to call
    /// without holding the worktree lock.
    pub async fn inspect_status(&self, path: &Path, branch: &str) -> Result<GitStatus> {
        let path = path.to_path_buf();
        let branch = branch.to_string();

        self.pool
            .run("status", move || {
                Self::require_on_branch(&path, &branch, "status")?;
                let output = GitCommand::new("status", &path)
                    .args(STATUS_ARGS)
                    .run()?;
                Ok(GitStatus::from_porcelain(&output))
            })
            .await
    }

    /// Merges `source` into `destination`, both local branches.
    ///
    /// Conflicts abort the merge and are reported in the outcome.
    pub async fn merge(&self, path: &Path, source: &str, destination: &str) -> Result<MergeOutcome> {
        let path = path.to_path_buf();
        let source = source.to_string();
        let destination = destination.to_string();
        let identity = self.merge_identity.clone();

        info!("Merging {} into {}", source, destination);

        self.pool
            .run("merge", move || {
                Self::merge_blocking(&path, &source, &destination, &identity)
            })
            .await
    }

    fn merge_blocking(
        path: &Path,
        source: &str,
        destination: &str,
        identity: &GitProfile,
    ) -> Result<MergeOutcome> {
        validate_branch_name(source)?;
        validate_branch_name(destination)?;

        let repo = Self::open_repo(path, "merge")?;
        if !Self::local_branch_exists(&repo, source) {
            return Err(GitSyncError::git_action(
                "merge",
                format!("branch '{}' not found", source),
            ));
        }
        Self::switch_branch_blocking(path, destination)?;

        let output = GitCommand::new("merge", path)
            .identity(&identity.author_name, &identity.author_email)
            .args(["merge", "--no-edit", source])
            .output()?;

        if output.success {
            return Ok(MergeOutcome {
                merged: true,
                conflicts: Vec::new(),
            });
        }

        let conflicts = Self::conflicts_blocking(path)?;
        if conflicts.is_empty() {
            return Err(GitSyncError::git_action("merge", output.combined()));
        }
        Self::abort_merge(path, "merge")?;

        Ok(MergeOutcome {
            merged: false,
            conflicts,
        })
    }

    /// Lists local branches followed by `origin/*` remote-tracking branches.
    pub async fn list_branches(&self, path: &Path) -> Result<Vec<String>> {
        let path = path.to_path_buf();

        self.pool
            .run("branch", move || Self::list_branches_blocking(&path))
            .await
    }

    fn list_branches_blocking(path: &Path) -> Result<Vec<String>> {
        let repo = Self::open_repo(path, "branch")?;
        let refs = repo
            .references()
            .map_err(|e| GitSyncError::git_action("branch", e.to_string()))?;

        let mut branches = Vec::new();

        let local = refs
            .local_branches()
            .map_err(|e| GitSyncError::git_action("branch", e.to_string()))?;
        for branch in local.flatten() {
            if let Ok(name) = branch.name().as_bstr().to_str()
                && let Some(short) = name.strip_prefix("refs/heads/")
            {
                branches.push(short.to_string());
            }
        }

        let remote = refs
            .remote_branches()
            .map_err(|e| GitSyncError::git_action("branch", e.to_string()))?;
        for branch in remote.flatten() {
            if let Ok(name) = branch.name().as_bstr().to_str()
                && let Some(short) = name.strip_prefix("refs/remotes/")
                && short.starts_with("origin/")
                && short != "origin/HEAD"
            {
                branches.push(short.to_string());
            }
        }

        Ok(branches)
    }

    /// Returns the commits reachable from `branch`, newest first.
    ///
    /// Order follows ancestry, never commit timestamps: a child always
    /// precedes its parents even when clocks were skewed. A branch without
    /// commits yet has an empty history.
    pub async fn commit_history(&self, path: &Path, branch: &str) -> Result<Vec<CommitRecord>> {
        let path = path.to_path_buf();
        let branch = branch.to_string();

        self.pool
            .run("log", move || Self::commit_history_blocking(&path, &branch))
            .await
    }

    fn commit_history_blocking(path: &Path, branch: &str) -> Result<Vec<CommitRecord>> {
        validate_branch_name(branch)?;
        let repo = Self::open_repo(path, "log")?;

        let reference = match repo.find_reference(&format!("refs/heads/{}", branch)) {
            Ok(reference) => reference,
            Err(_) => {
                // An unborn HEAD names a branch that has no ref yet.
                if Self::current_branch_blocking(path)?.as_deref() == Some(branch) {
                    return Ok(Vec::new());
                }
                return Err(GitSyncError::git_action(
                    "log",
                    format!("branch '{}' not found", branch),
                ));
            },
        };

        let tip = reference
            .into_fully_peeled_id()
            .map_err(|e| GitSyncError::git_action("log", format!("Failed to peel reference: {}", e)))?;
        let walk = tip
            .ancestors()
            .all()
            .map_err(|e| GitSyncError::git_action("log", e.to_string()))?;

        let mut history = Vec::new();
        for info in walk {
            let info = info.map_err(|e| GitSyncError::git_action("log", e.to_string()))?;
            let commit = repo
                .find_commit(info.id)
                .map_err(|e| GitSyncError::git_action("log", e.to_string()))?;

            let author = commit
                .author()
                .map_err(|e| GitSyncError::git_action("log", e.to_string()))?;
            let time = commit
                .time()
                .map_err(|e| GitSyncError::git_action("log", e.to_string()))?;
            let message = commit
                .message_raw()
                .map_err(|e| GitSyncError::git_action("log", e.to_string()))?;

            history.push(CommitRecord {
                hash: info.id.to_string(),
                author_name: author.name.to_str_lossy().into_owned(),
                author_email: author.email.to_str_lossy().into_owned(),
                timestamp: DateTime::<Utc>::from_timestamp(i64::from(time.seconds), 0)
                    .unwrap_or_default(),
                message: message.to_str_lossy().trim_end().to_string(),
            });
        }

        Ok(history)
    }

    /// Returns the branch HEAD points at, if any.
    pub async fn current_branch(&self, path: &Path) -> Result<Option<String>> {
        let path = path.to_path_buf();

        self.pool
            .run("status", move || Self::current_branch_blocking(&path))
            .await
    }

    /// Removes the `origin` remote, keeping the local history.
    pub async fn detach_remote(&self, path: &Path) -> Result<()> {
        let path = path.to_path_buf();

        self.pool
            .run("remote", move || Self::detach_remote_blocking(&path))
            .await
    }

    pub(crate) fn detach_remote_blocking(path: &Path) -> Result<()> {
        let output = GitCommand::new("remote", path)
            .args(["remote", "remove", "origin"])
            .output()?;

        if output.success || output.stderr.contains("No such remote") {
            Ok(())
        } else {
            Err(GitSyncError::git_action("remote", output.combined()))
        }
    }

    /// Makes `branch` the checked-out branch of the repository at `path`,
    /// initializing the repository and creating the branch as needed.
    pub(crate) fn prepare_branch_blocking(path: &Path, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;

        if !path.join(".git").exists() {
            std::fs::create_dir_all(path)?;
            GitCommand::new("init", path)
                .args(["init", "-q", "-b", branch])
                .run()?;
            debug!("Initialized repository at {:?} on {}", path, branch);
            return Ok(());
        }

        if Self::current_branch_blocking(path)?.as_deref() == Some(branch) {
            return Ok(());
        }

        let repo = Self::open_repo(path, "checkout")?;
        if Self::local_branch_exists(&repo, branch) {
            Self::force_checkout(path, branch)
        } else {
            GitCommand::new("checkout", path)
                .args(["checkout", "-q", "-b", branch])
                .run()?;
            Ok(())
        }
    }

    /// Switches to an existing local branch.
    ///
    /// Uncommitted edits to tracked files are discarded: worktree content is
    /// always reproducible from the database.
    pub(crate) fn switch_branch_blocking(path: &Path, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;

        if Self::current_branch_blocking(path)?.as_deref() == Some(branch) {
            return Ok(());
        }

        let repo = Self::open_repo(path, "checkout")?;
        if !Self::local_branch_exists(&repo, branch) {
            return Err(GitSyncError::git_action(
                "checkout",
                format!("branch '{}' does not exist locally", branch),
            ));
        }

        Self::force_checkout(path, branch)
    }

    fn force_checkout(path: &Path, branch: &str) -> Result<()> {
        debug!("Checking out {} in {:?}", branch, path);
        GitCommand::new("checkout", path)
            .args(["checkout", "-f", "-q", branch, "--"])
            .run()?;
        Ok(())
    }

    fn require_on_branch(path: &Path, branch: &str, action: &'static str) -> Result<()> {
        validate_branch_name(branch)?;
        let current = Self::current_branch_blocking(path)?;

        if current.as_deref() == Some(branch) {
            Ok(())
        } else {
            Err(GitSyncError::invalid_repo_state(format!(
                "git {}: worktree is on '{}', expected '{}'",
                action,
                current.unwrap_or_else(|| "detached HEAD".to_string()),
                branch
            )))
        }
    }

    pub(crate) fn current_branch_blocking(path: &Path) -> Result<Option<String>> {
        let repo = Self::open_repo(path, "status")?;
        let head = repo
            .head_name()
            .map_err(|e| GitSyncError::git_action("status", format!("Failed to read HEAD: {}", e)))?;

        Ok(head.map(|name| name.shorten().to_str_lossy().into_owned()))
    }

    fn head_is_born(path: &Path) -> Result<bool> {
        let repo = Self::open_repo(path, "status")?;
        Ok(repo.head_id().is_ok())
    }

    fn conflicts_blocking(path: &Path) -> Result<Vec<MergeConflict>> {
        let output = GitCommand::new("status", path).args(STATUS_ARGS).run()?;
        Ok(conflicts_from_porcelain(&output))
    }

    fn abort_merge(path: &Path, action: &'static str) -> Result<()> {
        debug!("Aborting merge in {:?}", path);
        GitCommand::new(action, path)
            .args(["merge", "--abort"])
            .run()?;
        Ok(())
    }

    fn local_branch_exists(repo: &gix::Repository, branch: &str) -> bool {
        repo.find_reference(&format!("refs/heads/{}", branch)).is_ok()
    }

    fn open_repo(path: &Path, action: &'static str) -> Result<gix::Repository> {
        gix::open(path)
            .map_err(|e| GitSyncError::git_action(action, format!("Failed to open repo: {}", e)))
    }
}

/// Condenses `git push --porcelain` output into one line per ref.
fn push_summary(stdout: &str) -> String {
    let refs: Vec<String> = stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let flag = fields.next()?;
            if flag.len() != 1 {
                return None;
            }
            let mapping = fields.next()?;
            let summary = fields.next().unwrap_or_default();
            let target = mapping.rsplit(':').next().unwrap_or(mapping);
            let target = target.strip_prefix("refs/heads/").unwrap_or(target);
            Some(format!("{} {}", target, summary).trim().to_string())
        })
        .collect();

    if refs.is_empty() {
        "Done".to_string()
    } else {
        refs.join(", ")
    }
}
