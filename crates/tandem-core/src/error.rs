//! Error types for Tandem.
//!
//! Every failure raised while orchestrating git operations is mapped into
//! [`GitSyncError`] before it reaches a caller. Only two conditions are not
//! errors at all: an empty commit inside a commit-and-push flow, and a pull
//! that finds nothing new on the remote. Both are modelled as structured
//! results by the git layer instead.
//!
//! # Example
//!
//! ```
//! use tandem_core::{GitSyncError, Result};
//!
//! fn require_branch(branch: &str) -> Result<&str> {
//!     if branch.is_empty() {
//!         return Err(GitSyncError::invalid_parameter("branchName"));
//!     }
//!     Ok(branch)
//! }
//!
//! assert!(require_branch("main").is_ok());
//! assert!(require_branch("").unwrap_err().is_invalid_parameter());
//! ```

use std::io;
use thiserror::Error;

/// Main error type for git synchronization operations.
#[derive(Debug, Error)]
pub enum GitSyncError {
    /// A required input was missing or malformed.
    #[error("Please enter a valid parameter {0}")]
    InvalidParameter(String),

    /// Git metadata or author profile is incomplete.
    #[error("Invalid git configuration: {0}")]
    InvalidGitConfiguration(String),

    /// The SSH keypair is absent or malformed.
    #[error("Invalid git credentials: {0}")]
    InvalidGitCredentials(String),

    /// The remote rejected the SSH key or the transport failed to authenticate.
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    /// The remote reference is malformed or unreachable.
    #[error("Invalid remote: {0}")]
    InvalidRemote(String),

    /// The worktree is not in a state the operation can work with.
    #[error("Invalid repository state: {0}")]
    InvalidRepoState(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A git action failed for a reason not covered by a more specific variant.
    #[error("git {action} failed: {detail}")]
    GitActionFailed {
        /// The attempted action ("commit", "push", "branch --list", ...)
        action: String,
        /// What went wrong
        detail: String,
    },

    /// A resource record was not found or is not accessible to the caller.
    #[error("No {entity} found with id {id}")]
    ResourceNotFound {
        /// The kind of record that was looked up
        entity: String,
        /// The identifier that was requested
        id: String,
    },

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GitSyncError {
    /// Creates an InvalidParameter error.
    pub fn invalid_parameter(name: impl Into<String>) -> Self {
        Self::InvalidParameter(name.into())
    }

    /// Creates an InvalidGitConfiguration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidGitConfiguration(message.into())
    }

    /// Creates an InvalidGitCredentials error.
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidGitCredentials(message.into())
    }

    /// Creates an InvalidRepoState error.
    pub fn invalid_repo_state(message: impl Into<String>) -> Self {
        Self::InvalidRepoState(message.into())
    }

    /// Creates a GitActionFailed error for the given action.
    ///
    /// ```
    /// use tandem_core::GitSyncError;
    ///
    /// let err = GitSyncError::git_action("commit", "nothing to commit");
    /// assert_eq!(err.to_string(), "git commit failed: nothing to commit");
    /// assert_eq!(err.action(), Some("commit"));
    /// ```
    pub fn git_action(action: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::GitActionFailed {
            action: action.into(),
            detail: detail.into(),
        }
    }

    /// Creates a ResourceNotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the attempted action for `GitActionFailed` errors.
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::GitActionFailed { action, .. } => Some(action),
            _ => None,
        }
    }

    /// Returns a short, stable name for the error kind, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::InvalidGitConfiguration(_) => "invalid_git_configuration",
            Self::InvalidGitCredentials(_) => "invalid_git_credentials",
            Self::AuthenticationFailure(_) => "authentication_failure",
            Self::InvalidRemote(_) => "invalid_remote",
            Self::InvalidRepoState(_) => "invalid_repo_state",
            Self::Io(_) => "io_failure",
            Self::GitActionFailed { .. } => "git_action_failed",
            Self::ResourceNotFound { .. } => "resource_not_found",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns true if this is an InvalidParameter error.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }

    /// Returns true if this is an InvalidGitConfiguration error.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidGitConfiguration(_))
    }

    /// Returns true if this error indicates a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}

/// Type alias for Results with GitSyncError.
pub type Result<T> = std::result::Result<T, GitSyncError>;
