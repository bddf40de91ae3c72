//! Configuration management
//!
//! This module handles loading, saving, and migrating the eeutil configuration file.
//! The configuration file is stored in TOML format at ~/.config/eeutil/config.toml,
//! or in the directory named by `EEU_CONFIG_DIR`.
//!
//! Changes to schema_version require migration support.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::Profile;
use crate::tasks::WaitOptions;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "EEU_CONFIG_DIR";

/// Default output format
const DEFAULT_OUTPUT: &str = "human";

/// Default color setting
const DEFAULT_COLOR: &str = "auto";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Configured profiles
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Default settings for CLI and library behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Show progress spinners
    #[serde(default = "default_true")]
    pub progress: bool,

    /// Fail on failed or timed out tasks instead of logging them
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Seconds between task status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Seconds to wait for ingestion tasks
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,

    /// Seconds to wait for export tasks
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Profile used when none is named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

fn default_upload_timeout() -> u64 {
    300
}

fn default_download_timeout() -> u64 {
    3600
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
            strict: true,
            poll_interval_secs: default_poll_interval(),
            upload_timeout_secs: default_upload_timeout(),
            download_timeout_secs: default_download_timeout(),
            default_profile: None,
        }
    }
}

impl Defaults {
    /// Polling settings for ingestion tasks
    pub fn upload_wait(&self) -> WaitOptions {
        self.wait_options(self.upload_timeout_secs)
    }

    /// Polling settings for export tasks
    pub fn download_wait(&self) -> WaitOptions {
        self.wait_options(self.download_timeout_secs)
    }

    /// Polling settings with an explicit timeout
    pub fn wait_options(&self, timeout_secs: u64) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            strict: self.strict,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            profiles: Vec::new(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(Self::with_path(PathBuf::from(dir).join("config.toml")));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let config_path = config_dir.join("eeutil").join("config.toml");
        Ok(Self { config_path })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade eeutil.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only), since profiles
    /// may carry HMAC secrets.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        tracing::debug!(
            "Migrating configuration from schema {} to {}",
            config.schema_version,
            SCHEMA_VERSION
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults.output, "human");
        assert_eq!(config.defaults.color, "auto");
        assert!(config.defaults.progress);
        assert!(config.defaults.strict);
        assert_eq!(config.defaults.poll_interval_secs, 5);
        assert_eq!(config.defaults.upload_timeout_secs, 300);
        assert_eq!(config.defaults.download_timeout_secs, 3600);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let mut config = Config::default();
        let mut profile = Profile::new("work");
        profile.project = Some("my-proj".to_string());
        profile.bucket = Some("my-staging".to_string());
        config.profiles.push(profile);
        config.defaults.default_profile = Some("work".to_string());

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.profiles.len(), 1);
        assert_eq!(loaded.profiles[0].name, "work");
        assert_eq!(loaded.profiles[0].project.as_deref(), Some("my-proj"));
        assert_eq!(loaded.defaults.default_profile.as_deref(), Some("work"));
    }

    #[test]
    fn test_partial_defaults_fill_in() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            "schema_version = 1\n[defaults]\nstrict = false\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert!(!config.defaults.strict);
        assert_eq!(config.defaults.poll_interval_secs, 5);
        assert_eq!(config.defaults.output, "human");
    }

    #[test]
    fn test_wait_options_from_defaults() {
        let defaults = Defaults::default();
        let wait = defaults.upload_wait();
        assert_eq!(wait.timeout, Duration::from_secs(300));
        assert_eq!(wait.poll_interval, Duration::from_secs(5));
        assert!(wait.strict);

        let wait = defaults.download_wait();
        assert_eq!(wait.timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!(
            r#"
            schema_version = {}
            "#,
            SCHEMA_VERSION + 1
        );
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("newer than supported"));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (manager, _temp_dir) = temp_config_manager();
        manager.save(&Config::default()).unwrap();
        let mode = std::fs::metadata(manager.config_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
