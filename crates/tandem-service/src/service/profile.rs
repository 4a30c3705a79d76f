//! Commit author profiles of the calling user.

use tracing::{debug, instrument};

use tandem_core::{Access, Caller, GitProfile, ProfileSet, ResourceId, Result};

use super::GitSyncService;
use crate::metrics::observe;

impl GitSyncService {
    /// Returns the caller's profile for the lineage `root`, falling back to
    /// their default. Without a root, returns the default.
    #[instrument(skip_all)]
    pub async fn get_profile(
        &self,
        caller: &Caller,
        root: Option<&ResourceId>,
    ) -> Result<Option<GitProfile>> {
        observe("get_profile", async {
            if let Some(root) = root {
                self.authorize(caller, root, Access::Read).await?;
            }

            let profiles = self.profiles.get_profiles(caller.user_id()).await?;
            Ok(profiles.resolve(root).cloned())
        })
        .await
    }

    /// Stores `profile` for the caller, as their default or as the override
    /// for the lineage `root`, and returns all of their profiles.
    #[instrument(skip_all)]
    pub async fn set_profile(
        &self,
        caller: &Caller,
        profile: GitProfile,
        is_default: bool,
        root: Option<&ResourceId>,
    ) -> Result<ProfileSet> {
        observe("set_profile", async {
            if let Some(root) = root {
                self.authorize(caller, root, Access::Write).await?;
            }
            self.store_profile(caller, profile, is_default, root).await
        })
        .await
    }

    pub(super) async fn store_profile(
        &self,
        caller: &Caller,
        profile: GitProfile,
        is_default: bool,
        root: Option<&ResourceId>,
    ) -> Result<ProfileSet> {
        profile.validate()?;

        let user = caller.user_id();
        let mut profiles = self.profiles.get_profiles(user).await?;
        if profiles.apply(profile, is_default, root) {
            debug!("Saving git profiles of {}", user);
            self.profiles.save_profiles(user, profiles.clone()).await?;
        }

        Ok(profiles)
    }
}
