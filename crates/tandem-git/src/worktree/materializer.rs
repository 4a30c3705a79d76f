//! Writing artifact trees into worktrees and reading them back.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use tandem_core::{ArtifactTree, GitSyncError, Result, artifact::validate_path};

use super::seed::{self, SEED_FILE};
use crate::pool::BlockingPool;
use crate::repository::GitExecutor;

/// What happens to a worktree when its lineage disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetirePolicy {
    /// Remove the worktree directory.
    #[default]
    Delete,
    /// Keep the files and history, drop the `origin` remote.
    Detach,
}

/// Keeps worktree contents equal to artifact trees.
///
/// `.git` and the seed document are reserved: materialization never
/// touches them and reconstruction never reports them.
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    pool: BlockingPool,
}

impl Materializer {
    /// Creates a materializer running on `pool`.
    pub fn new(pool: BlockingPool) -> Self {
        Self { pool }
    }

    /// Makes the worktree at `path` hold exactly `artifact` on `branch`.
    ///
    /// Initializes the repository when needed and checks out or creates
    /// `branch`. Unchanged files are left untouched, so materializing the
    /// same artifact twice is a no-op.
    pub async fn materialize(
        &self,
        path: &Path,
        artifact: &ArtifactTree,
        branch: &str,
    ) -> Result<PathBuf> {
        let path = path.to_path_buf();
        let artifact = artifact.clone();
        let branch = branch.to_string();

        self.pool
            .run("materialize", move || {
                Self::materialize_blocking(&path, &artifact, &branch)?;
                Ok(path)
            })
            .await
    }

    fn materialize_blocking(path: &Path, artifact: &ArtifactTree, branch: &str) -> Result<()> {
        for file in artifact.paths() {
            validate_artifact_path(file)?;
        }

        GitExecutor::prepare_branch_blocking(path, branch)?;

        let existing = scan_files(path)?;
        let wanted: BTreeSet<String> = artifact.paths().map(str::to_string).collect();

        let stale: Vec<&String> = existing.difference(&wanted).collect();
        for file in &stale {
            fs::remove_file(path.join(file.as_str()))?;
        }
        prune_empty_dirs(path)?;

        let mut written = 0usize;
        for (file, content) in artifact.iter() {
            let target = path.join(file);
            if fs::read(&target).is_ok_and(|current| current == content.as_bytes()) {
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content)?;
            written += 1;
        }

        debug!(
            "Materialized {} files into {:?} ({} written, {} removed)",
            artifact.len(),
            path,
            written,
            stale.len()
        );
        Ok(())
    }

    /// Reads the tree of `branch` back from the worktree at `path`.
    pub async fn reconstruct(&self, path: &Path, branch: &str) -> Result<ArtifactTree> {
        let path = path.to_path_buf();
        let branch = branch.to_string();

        self.pool
            .run("reconstruct", move || Self::reconstruct_blocking(&path, &branch))
            .await
    }

    fn reconstruct_blocking(path: &Path, branch: &str) -> Result<ArtifactTree> {
        GitExecutor::switch_branch_blocking(path, branch)?;

        let mut artifact = ArtifactTree::new();
        for file in scan_files(path)? {
            let content = fs::read_to_string(path.join(&file))?;
            artifact.insert(file, content)?;
        }

        Ok(artifact)
    }

    /// Writes the seed document linking to the application.
    pub async fn bootstrap(&self, path: &Path, view_url: &str, edit_url: &str) -> Result<()> {
        let target = path.join(SEED_FILE);
        let content = seed::render(view_url, edit_url);

        self.pool
            .run("bootstrap", move || {
                fs::write(&target, content)?;
                Ok(())
            })
            .await
    }

    /// Returns true when `path` is missing or holds nothing but `.git`.
    pub async fn is_empty(&self, path: &Path) -> Result<bool> {
        let path = path.to_path_buf();

        self.pool
            .run("is_empty", move || Self::is_empty_blocking(&path))
            .await
    }

    fn is_empty_blocking(path: &Path) -> Result<bool> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            if entry?.file_name() != ".git" {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Retires the worktree at `path` according to `policy`.
    pub async fn retire(&self, path: &Path, policy: RetirePolicy) -> Result<()> {
        let path = path.to_path_buf();

        info!("Retiring worktree {:?} ({:?})", path, policy);

        self.pool
            .run("retire", move || {
                if !path.exists() {
                    return Ok(());
                }
                match policy {
                    RetirePolicy::Delete => fs::remove_dir_all(&path)?,
                    RetirePolicy::Detach if path.join(".git").exists() => {
                        GitExecutor::detach_remote_blocking(&path)?
                    },
                    RetirePolicy::Detach => {},
                }
                Ok(())
            })
            .await
    }
}

/// Checks that an artifact path may be written into a worktree.
pub fn validate_artifact_path(path: &str) -> Result<()> {
    validate_path(path)?;
    if path == SEED_FILE {
        return Err(GitSyncError::invalid_parameter(format!(
            "artifact path '{}' is reserved",
            path
        )));
    }
    Ok(())
}

fn is_reserved(relative: &Path) -> bool {
    let in_git_dir = matches!(
        relative.components().next(),
        Some(Component::Normal(first)) if first == ".git"
    );
    in_git_dir || relative == Path::new(SEED_FILE)
}

/// Lists the non-reserved files under `root` as `/`-separated relative paths.
fn scan_files(root: &Path) -> Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.depth() != 1 || entry.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| GitSyncError::internal(e.to_string()))?;
        if is_reserved(relative) {
            continue;
        }

        let segments = relative
            .components()
            .map(|component| {
                component.as_os_str().to_str().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("non UTF-8 file name {:?}", relative),
                    )
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        files.insert(segments.join("/"));
    }

    Ok(files)
}

/// Removes directories left empty under `root`, deepest first.
///
/// The walk is pre-order so `filter_entry` can keep it out of `.git`;
/// a fresh repository has empty directories there that git needs.
fn prune_empty_dirs(root: &Path) -> Result<()> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.depth() != 1 || entry.file_name() != ".git");

    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    for dir in dirs.iter().rev() {
        if fs::read_dir(dir)?.next().is_none() {
            fs::remove_dir(dir)?;
        }
    }

    Ok(())
}
