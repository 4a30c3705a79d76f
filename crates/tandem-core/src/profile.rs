//! Commit author profiles.
//!
//! A user has one default profile and may override it per lineage. The
//! override wins when resolving the author of a commit on that lineage.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{GitSyncError, Result};
use crate::types::{ResourceId, UserId};

/// The identity written into commits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitProfile {
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
}

impl GitProfile {
    /// Creates a profile.
    pub fn new(author_name: impl Into<String>, author_email: impl Into<String>) -> Self {
        Self {
            author_name: author_name.into(),
            author_email: author_email.into(),
        }
    }

    /// Checks both fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.author_name.trim().is_empty() {
            return Err(GitSyncError::invalid_parameter("Author Name"));
        }
        if self.author_email.trim().is_empty() {
            return Err(GitSyncError::invalid_parameter("Author Email"));
        }
        Ok(())
    }
}

/// All profiles of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSet {
    /// Profile used when no lineage override exists.
    pub default: Option<GitProfile>,
    /// Overrides keyed by root resource id.
    #[serde(default)]
    pub overrides: HashMap<ResourceId, GitProfile>,
}

impl ProfileSet {
    /// Returns the profile for commits on the lineage `root`, falling back
    /// to the default. With no root, returns the default.
    pub fn resolve(&self, root: Option<&ResourceId>) -> Option<&GitProfile> {
        root.and_then(|r| self.overrides.get(r))
            .or(self.default.as_ref())
    }

    /// Records `profile` and reports whether anything changed.
    ///
    /// The profile becomes the default when explicitly requested, when no
    /// root is given, or when the user has no applicable profile yet.
    /// Otherwise it is stored as the override for `root`.
    ///
    /// ```
    /// use tandem_core::{GitProfile, ProfileSet, ResourceId};
    ///
    /// let root = ResourceId::new("app");
    /// let mut set = ProfileSet::default();
    /// set.apply(GitProfile::new("Ada", "ada@home"), false, Some(&root));
    /// set.apply(GitProfile::new("Ada L.", "ada@work"), false, Some(&root));
    ///
    /// assert_eq!(set.default.as_ref().unwrap().author_email, "ada@home");
    /// assert_eq!(set.resolve(Some(&root)).unwrap().author_email, "ada@work");
    /// ```
    pub fn apply(&mut self, profile: GitProfile, is_default: bool, root: Option<&ResourceId>) -> bool {
        let current = self.resolve(root);
        if current == Some(&profile) {
            return false;
        }
        let has_current = current.is_some();

        match root {
            Some(root) if has_current && !is_default => {
                self.overrides.insert(root.clone(), profile);
            },
            _ => self.default = Some(profile),
        }

        true
    }

    /// Returns true if the user has no profile at all.
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.overrides.is_empty()
    }
}

/// Storage for user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the profiles of `user`, empty if none were saved.
    async fn get_profiles(&self, user: &UserId) -> Result<ProfileSet>;

    /// Replaces the profiles of `user`.
    async fn save_profiles(&self, user: &UserId, profiles: ProfileSet) -> Result<()>;
}

/// A process-local profile store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<UserId, ProfileSet>>,
}

impl InMemoryProfileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profiles(&self, user: &UserId) -> Result<ProfileSet> {
        Ok(self.profiles.read().get(user).cloned().unwrap_or_default())
    }

    async fn save_profiles(&self, user: &UserId, profiles: ProfileSet) -> Result<()> {
        self.profiles.write().insert(user.clone(), profiles);
        Ok(())
    }
}
