//! Profile management
//!
//! A profile is a named set of credentials and defaults for one Earth Engine
//! project and its staging bucket. Environment variables override whatever
//! the stored profile says.

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigManager};
use crate::error::{Error, Result};
use crate::path::LEGACY_PROJECT;

/// Service account email
pub const ENV_SERVICE_ACCOUNT: &str = "GEE_SERVICE_ACCOUNT";
/// Path to a service account key file
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Service account key as an inline JSON string
pub const ENV_CREDENTIAL_JSON: &str = "GEE_JSON";
/// Cloud project
pub const ENV_PROJECT: &str = "GEE_PROJECT";
/// Staging bucket
pub const ENV_BUCKET: &str = "GEE_STAGING_BUCKET";
/// Explicit asset root
pub const ENV_ROOT: &str = "GEE_ROOT";
/// HMAC access key for the staging bucket
pub const ENV_HMAC_ACCESS_KEY: &str = "GCS_HMAC_ACCESS_KEY";
/// HMAC secret for the staging bucket
pub const ENV_HMAC_SECRET: &str = "GCS_HMAC_SECRET";

/// Name of the profile built purely from the environment
pub const ENV_PROFILE_NAME: &str = "env";

const DEFAULT_EE_ENDPOINT: &str = "https://earthengine.googleapis.com";
const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Timeout configuration for HTTP clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    60000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
        }
    }
}

/// Credentials and defaults for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// Service account email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    /// Path to a service account key or authorized-user credentials file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_path: Option<String>,

    /// Inline service account key, only ever read from the environment
    #[serde(skip)]
    pub credential_json: Option<String>,

    /// Cloud project; the legacy project when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Staging bucket name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Asset root relative paths resolve against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// HMAC access key for the staging bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac_access_key: Option<String>,

    /// HMAC secret for the staging bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac_secret: Option<String>,

    /// Earth Engine API endpoint
    #[serde(default = "default_ee_endpoint")]
    pub ee_endpoint: String,

    /// Cloud Storage XML API endpoint
    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

fn default_ee_endpoint() -> String {
    DEFAULT_EE_ENDPOINT.to_string()
}

fn default_storage_endpoint() -> String {
    DEFAULT_STORAGE_ENDPOINT.to_string()
}

impl Profile {
    /// Create an empty profile
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_account: None,
            credential_path: None,
            credential_json: None,
            project: None,
            bucket: None,
            root: None,
            hmac_access_key: None,
            hmac_secret: None,
            ee_endpoint: default_ee_endpoint(),
            storage_endpoint: default_storage_endpoint(),
            timeout: None,
        }
    }

    /// Override fields with non-empty values from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_SERVICE_ACCOUNT) {
            self.service_account = Some(v);
        }
        if let Some(v) = get(ENV_CREDENTIALS) {
            self.credential_path = Some(v);
        }
        if let Some(v) = get(ENV_CREDENTIAL_JSON) {
            self.credential_json = Some(v);
        }
        if let Some(v) = get(ENV_PROJECT) {
            self.project = Some(v);
        }
        if let Some(v) = get(ENV_BUCKET) {
            self.bucket = Some(v);
        }
        if let Some(v) = get(ENV_ROOT) {
            self.root = Some(v);
        }
        if let Some(v) = get(ENV_HMAC_ACCESS_KEY) {
            self.hmac_access_key = Some(v);
        }
        if let Some(v) = get(ENV_HMAC_SECRET) {
            self.hmac_secret = Some(v);
        }
    }

    /// Effective project
    pub fn project(&self) -> &str {
        self.project.as_deref().unwrap_or(LEGACY_PROJECT)
    }

    /// Get the effective timeout configuration
    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }

    /// Check that the profile is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("Profile name cannot be empty".into()));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::Config(format!(
                "Profile name '{}' may only contain letters, digits, '-' and '_'",
                self.name
            )));
        }
        url::Url::parse(&self.ee_endpoint)?;
        url::Url::parse(&self.storage_endpoint)?;
        if self.hmac_access_key.is_some() != self.hmac_secret.is_some() {
            return Err(Error::Config(
                "HMAC access key and secret must be set together".into(),
            ));
        }
        Ok(())
    }
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// Load the full configuration
    pub fn config(&self) -> Result<Config> {
        self.config_manager.load()
    }

    /// List all configured profiles
    pub fn list(&self) -> Result<Vec<Profile>> {
        let config = self.config_manager.load()?;
        Ok(config.profiles)
    }

    /// Get a profile by name
    pub fn get(&self, name: &str) -> Result<Profile> {
        let config = self.config_manager.load()?;
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Add or update a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        profile.validate()?;
        let mut config = self.config_manager.load()?;

        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        if config.defaults.default_profile.as_deref() == Some(name) {
            config.defaults.default_profile = None;
        }

        self.config_manager.save(&config)
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.profiles.iter().any(|p| p.name == name))
    }

    /// Mark a profile as the default
    pub fn set_default(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        if !config.profiles.iter().any(|p| p.name == name) {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        config.defaults.default_profile = Some(name.to_string());
        self.config_manager.save(&config)
    }

    /// Pick the profile to run with and overlay the environment
    ///
    /// An explicit name wins, then the configured default profile; with
    /// neither, the profile comes from the environment alone.
    pub fn resolve<F>(&self, name: Option<&str>, lookup: F) -> Result<Profile>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = self.config_manager.load()?;
        let chosen = name.or(config.defaults.default_profile.as_deref());

        let mut profile = match chosen {
            Some(name) => config
                .profiles
                .iter()
                .find(|p| p.name == name)
                .cloned()
                .ok_or_else(|| Error::ProfileNotFound(name.to_string()))?,
            None => Profile::new(ENV_PROFILE_NAME),
        };
        profile.apply_env(lookup);
        Ok(profile)
    }
}
