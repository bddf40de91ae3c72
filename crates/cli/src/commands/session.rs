//! Shared setup for commands that talk to the platform

use eeu_core::{AssetManager, Defaults, Profile, ProfileManager, Result};
use eeu_ee::EeClient;
use eeu_gcs::{GcsStaging, default_bucket_name};

/// Resolved profile plus the clients built from it
pub struct Session {
    pub profile: Profile,
    pub defaults: Defaults,
    client: EeClient,
}

impl Session {
    /// Resolve the profile, overlay the environment and authenticate
    pub fn open(profile: Option<&str>) -> Result<Self> {
        let manager = ProfileManager::new()?;
        let defaults = manager.config()?.defaults;
        let profile = manager.resolve(profile, |key| std::env::var(key).ok())?;
        tracing::debug!("Using profile {} (project {})", profile.name, profile.project());
        let client = EeClient::new(&profile)?;
        Ok(Self {
            profile,
            defaults,
            client,
        })
    }

    pub fn client(&self) -> &EeClient {
        &self.client
    }

    pub fn assets(&self) -> AssetManager<'_, EeClient> {
        AssetManager::new(&self.client, self.client.project()).with_root(self.profile.root.clone())
    }

    /// Staging bucket client
    ///
    /// Without a configured bucket, one is derived from the asset root.
    pub async fn staging(&self, assets: &AssetManager<'_, EeClient>) -> Result<GcsStaging> {
        let bucket = match &self.profile.bucket {
            Some(bucket) => bucket.clone(),
            None => {
                let name = default_bucket_name(assets.home().await?.as_str());
                tracing::warn!("No staging bucket configured, using {name}");
                name
            }
        };
        GcsStaging::new(&self.profile, bucket).await
    }
}
