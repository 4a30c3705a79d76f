//! Request and response types of the orchestration service.

use serde::{Deserialize, Serialize};

use tandem_core::{GitMetadata, GitProfile, Resource};
use tandem_git::PullStatus;

/// Parameters for connecting a root resource to a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// SSH url of an empty remote repository.
    pub remote_url: String,
    /// Origin the view/edit links in the seed document point at.
    pub origin_header: String,
    /// Author profile to store for the caller, if any.
    #[serde(default)]
    pub profile: Option<GitProfile>,
    /// Store `profile` as the caller's default rather than a lineage override.
    #[serde(default)]
    pub default_profile: bool,
}

impl ConnectRequest {
    /// Creates a request without a profile.
    pub fn new(remote_url: impl Into<String>, origin_header: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            origin_header: origin_header.into(),
            profile: None,
            default_profile: false,
        }
    }

    /// Attaches an author profile.
    pub fn with_profile(mut self, profile: GitProfile, default_profile: bool) -> Self {
        self.profile = Some(profile);
        self.default_profile = default_profile;
        self
    }
}

/// Parameters for a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    /// Commit message; the configured default is used when absent or blank.
    #[serde(default)]
    pub message: Option<String>,
    /// Push after committing.
    #[serde(default)]
    pub do_push: bool,
}

impl CommitRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            do_push: false,
        }
    }

    pub fn and_push(mut self) -> Self {
        self.do_push = true;
        self
    }
}

/// Result of pulling a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullOutcome {
    /// The branch record, refreshed when remote changes were imported.
    pub resource: Resource,
    pub status: PullStatus,
}

/// Author profiles shown alongside the metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub default: Option<GitProfile>,
    pub lineage: Option<GitProfile>,
}

/// Git metadata of a root resource as shown to its users.
///
/// Carries the public key only; the private key never leaves the
/// credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    pub metadata: GitMetadata,
    pub public_key: String,
    pub profiles: ProfileView,
}
