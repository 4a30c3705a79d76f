//! Service settings.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use tandem_core::GitProfile;
use tandem_git::{DEFAULT_MAX_BLOCKING, RetirePolicy};

/// Settings for the orchestration service.
///
/// Loaded from an optional `tandem.toml` and `TANDEM__*` environment
/// variables, e.g. `TANDEM__WORKTREE_ROOT=/srv/tandem/repos` or
/// `TANDEM__MERGE_AUTHOR_NAME=Bot`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory under which all worktrees live.
    #[serde(default = "default_worktree_root")]
    worktree_root: PathBuf,

    /// Upper bound on concurrently running git/filesystem operations.
    #[serde(default = "default_max_blocking_operations")]
    max_blocking_operations: usize,

    /// Message used when a commit request carries none.
    #[serde(default = "default_commit_message")]
    default_commit_message: String,

    /// What disconnecting does to the local worktree.
    #[serde(default)]
    retire_policy: RetirePolicy,

    /// Author name for merge commits created while pulling or merging.
    #[serde(default = "default_merge_author_name")]
    merge_author_name: String,

    /// Author email for merge commits.
    #[serde(default = "default_merge_author_email")]
    merge_author_email: String,
}

fn default_worktree_root() -> PathBuf {
    PathBuf::from("/var/lib/tandem/repos")
}

fn default_max_blocking_operations() -> usize {
    DEFAULT_MAX_BLOCKING
}

fn default_commit_message() -> String {
    "System generated commit".to_string()
}

fn default_merge_author_name() -> String {
    "Tandem".to_string()
}

fn default_merge_author_email() -> String {
    "tandem@localhost".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worktree_root: default_worktree_root(),
            max_blocking_operations: default_max_blocking_operations(),
            default_commit_message: default_commit_message(),
            retire_policy: RetirePolicy::default(),
            merge_author_name: default_merge_author_name(),
            merge_author_email: default_merge_author_email(),
        }
    }
}

impl Settings {
    /// Loads settings from `tandem.toml` in the working directory, if
    /// present, and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("tandem").required(false))
    }

    /// Loads settings from `path` and the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("TANDEM").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Returns the worktree root.
    pub fn worktree_root(&self) -> &Path {
        &self.worktree_root
    }

    /// Returns the blocking operation bound.
    pub fn max_blocking_operations(&self) -> usize {
        self.max_blocking_operations
    }

    /// Returns the fallback commit message.
    pub fn default_commit_message(&self) -> &str {
        &self.default_commit_message
    }

    /// Returns the disconnect policy.
    pub fn retire_policy(&self) -> RetirePolicy {
        self.retire_policy
    }

    /// Returns the merge commit identity.
    pub fn merge_author(&self) -> GitProfile {
        GitProfile::new(&self.merge_author_name, &self.merge_author_email)
    }

    /// Sets the worktree root.
    pub fn with_worktree_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.worktree_root = root.into();
        self
    }

    /// Sets the blocking operation bound.
    pub fn with_max_blocking_operations(mut self, max: usize) -> Self {
        self.max_blocking_operations = max;
        self
    }

    /// Sets the fallback commit message.
    pub fn with_default_commit_message(mut self, message: impl Into<String>) -> Self {
        self.default_commit_message = message.into();
        self
    }

    /// Sets the disconnect policy.
    pub fn with_retire_policy(mut self, policy: RetirePolicy) -> Self {
        self.retire_policy = policy;
        self
    }

    /// Sets the merge commit identity.
    pub fn with_merge_author(mut self, author: GitProfile) -> Self {
        self.merge_author_name = author.author_name;
        self.merge_author_email = author.author_email;
        self
    }
}
