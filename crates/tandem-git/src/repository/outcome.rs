//! Structured results of git operations.

use std::collections::BTreeSet;

use serde::Serialize;

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CommitOutcome {
    /// A commit was created.
    Committed { hash: String, summary: String },
    /// The worktree matched HEAD.
    NothingToCommit,
}

impl CommitOutcome {
    /// Returns the new commit hash, if any.
    pub fn hash(&self) -> Option<&str> {
        match self {
            CommitOutcome::Committed { hash, .. } => Some(hash),
            CommitOutcome::NothingToCommit => None,
        }
    }
}

/// Result of pulling a branch from its remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PullStatus {
    /// Nothing to fetch, or the fetched commits were already merged.
    UpToDate,
    /// Remote commits were fetched and merged into the branch.
    FetchedAndMerged { summary: String },
    /// The pull could not complete; any merge in progress was aborted.
    Failed {
        detail: String,
        conflicts: Vec<MergeConflict>,
    },
}

/// How a path conflicts after a failed merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    BothModified,
    BothAdded,
    BothDeleted,
    AddedByUs,
    AddedByThem,
    DeletedByUs,
    DeletedByThem,
}

impl ConflictKind {
    /// Maps a two letter porcelain status code to a conflict kind.
    pub fn from_porcelain(code: &str) -> Option<Self> {
        match code {
            "UU" => Some(ConflictKind::BothModified),
            "AA" => Some(ConflictKind::BothAdded),
            "DD" => Some(ConflictKind::BothDeleted),
            "AU" => Some(ConflictKind::AddedByUs),
            "UA" => Some(ConflictKind::AddedByThem),
            "DU" => Some(ConflictKind::DeletedByUs),
            "UD" => Some(ConflictKind::DeletedByThem),
            _ => None,
        }
    }
}

/// A single conflicting path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MergeConflict {
    pub path: String,
    pub kind: ConflictKind,
}

/// Result of merging one local branch into another.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub merged: bool,
    pub conflicts: Vec<MergeConflict>,
}

/// Working tree status relative to HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitStatus {
    pub added: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub conflicting: BTreeSet<String>,
    pub is_clean: bool,
}

impl GitStatus {
    /// Builds a status from `git status --porcelain=v1` output.
    pub fn from_porcelain(output: &str) -> Self {
        let mut status = GitStatus::default();

        for line in output.lines() {
            let Some((code, path)) = split_porcelain(line) else {
                continue;
            };
            let path = path.to_string();

            if ConflictKind::from_porcelain(code).is_some() {
                status.conflicting.insert(path);
                continue;
            }

            let mut flags = code.chars();
            let index = flags.next().unwrap_or(' ');
            let worktree = flags.next().unwrap_or(' ');

            if code == "??" || index == 'A' {
                status.added.insert(path);
            } else if index == 'D' || worktree == 'D' {
                status.removed.insert(path);
            } else if matches!(index, 'M' | 'T') || matches!(worktree, 'M' | 'T') {
                status.modified.insert(path);
            }
        }

        status.is_clean = status.added.is_empty()
            && status.modified.is_empty()
            && status.removed.is_empty()
            && status.conflicting.is_empty();
        status
    }
}

/// Extracts conflicting paths from `git status --porcelain=v1` output.
pub(crate) fn conflicts_from_porcelain(output: &str) -> Vec<MergeConflict> {
    let mut conflicts: Vec<MergeConflict> = output
        .lines()
        .filter_map(split_porcelain)
        .filter_map(|(code, path)| {
            ConflictKind::from_porcelain(code).map(|kind| MergeConflict {
                path: path.to_string(),
                kind,
            })
        })
        .collect();
    conflicts.sort();
    conflicts
}

fn split_porcelain(line: &str) -> Option<(&str, &str)> {
    if line.len() < 4 || !line.is_char_boundary(2) {
        return None;
    }
    let (code, rest) = line.split_at(2);
    let path = rest.strip_prefix(' ')?;
    let path = path
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path);
    Some((code, path))
}
