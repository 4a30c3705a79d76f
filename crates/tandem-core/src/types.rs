//! Common type definitions and newtypes for Tandem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is empty or whitespace.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a resource record (root or branch).
    ///
    /// ```
    /// use tandem_core::ResourceId;
    ///
    /// let id = ResourceId::new("app-1");
    /// assert_eq!(id.as_str(), "app-1");
    /// ```
    ResourceId
);

string_id!(
    /// Identifier of the workspace (organization) owning a resource.
    WorkspaceId
);

string_id!(
    /// Identifier of a user acting on resources.
    UserId
);

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    user_id: UserId,
}

impl Caller {
    /// Creates a caller for the given user.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Returns the caller's user id.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// A single entry of a branch's commit log.
///
/// Produced on demand from the worktree, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Full commit hash.
    pub hash: String,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// First line of the commit message.
    pub message: String,
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} <{}> {}",
            &self.hash[..8.min(self.hash.len())],
            self.author_name,
            self.author_email,
            self.message
        )
    }
}
