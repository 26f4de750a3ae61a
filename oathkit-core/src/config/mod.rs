//! Configuration module
//!
//! Handles loading and saving oathkit configuration from TOML files.

use crate::policy::environment::StaticEnvironment;
use crate::storage::DEFAULT_KEYRING_SERVICE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod toml_config;

/// Default credential file name inside the configuration directory
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Where credentials are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file on disk
    #[default]
    File,
    /// System keyring
    Keyring,
    /// Process memory only; nothing survives exit
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "unknown storage backend '{}', expected file, keyring or memory",
                other
            )),
        }
    }
}

/// Credential storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Credential file for the `file` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Keyring service name for the `keyring` backend
    #[serde(default = "default_service")]
    pub service: String,
}

fn default_service() -> String {
    DEFAULT_KEYRING_SERVICE.to_string()
}

impl StorageConfig {
    /// Credential file location, defaulting to `config_dir/credentials.json`
    pub fn file_path(&self, config_dir: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| config_dir.join(CREDENTIALS_FILE_NAME))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            service: default_service(),
        }
    }
}

/// OATH service behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Keep credentials in memory between operations
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_enabled: default_cache_enabled(),
        }
    }
}

/// Complete oathkit configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OathConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    /// Device capabilities policies are evaluated against
    #[serde(default)]
    pub environment: StaticEnvironment,
}

impl OathConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.storage.backend == StorageBackend::Keyring && self.storage.service.trim().is_empty() {
            return Err("Keyring service name cannot be empty".to_string());
        }

        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                return Err("Storage path cannot be empty".to_string());
            }
        }

        self.environment.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OathConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.service, "oathkit");
        assert!(config.service.cache_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_path_defaults_to_config_dir() {
        let config = StorageConfig::default();
        assert_eq!(
            config.file_path(Path::new("/tmp/oathkit")),
            PathBuf::from("/tmp/oathkit/credentials.json")
        );

        let custom = StorageConfig {
            path: Some(PathBuf::from("/data/creds.json")),
            ..StorageConfig::default()
        };
        assert_eq!(
            custom.file_path(Path::new("/tmp/oathkit")),
            PathBuf::from("/data/creds.json")
        );
    }

    #[test]
    fn test_invalid_configs() {
        let mut keyring = OathConfig::default();
        keyring.storage.backend = StorageBackend::Keyring;
        keyring.storage.service = " ".to_string();
        assert!(keyring.validate().is_err());

        let mut tamper = OathConfig::default();
        tamper.environment.tamper_score = 1.5;
        assert!(tamper.validate().is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("Keyring".parse::<StorageBackend>(), Ok(StorageBackend::Keyring));
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
