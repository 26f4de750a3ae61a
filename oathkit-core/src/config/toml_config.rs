//! TOML configuration file I/O
//!
//! Handles loading and saving oathkit configuration to/from TOML files
//! in the user's configuration directory.

use crate::config::OathConfig;
use crate::error::{ConfigError, OathkitError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "OATHKIT_CONFIG_DIR";

/// Get the default configuration directory
///
/// Returns ~/.config/oathkit, or the OATHKIT_CONFIG_DIR environment variable if set
pub fn get_config_dir() -> Result<PathBuf, OathkitError> {
    // Allow tests to override config directory via environment variable
    if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        OathkitError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;

    Ok(PathBuf::from(home).join(".config").join("oathkit"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, OathkitError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Check if a configuration file exists
pub fn config_exists() -> Result<bool, OathkitError> {
    let config_path = get_config_path()?;
    Ok(config_path.exists())
}

/// Load configuration from the default TOML file
pub fn load_config() -> Result<OathConfig, OathkitError> {
    let config_path = get_config_path()?;
    load_config_from_path(&config_path)
}

/// Load configuration from the default TOML file, or defaults when absent
pub fn load_config_or_default() -> Result<OathConfig, OathkitError> {
    if config_exists()? {
        load_config()
    } else {
        debug!("No configuration file found, using defaults");
        Ok(OathConfig::default())
    }
}

/// Load configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<OathConfig, OathkitError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OathkitError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => OathkitError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: OathConfig = toml::from_str(&contents).map_err(|e| {
        OathkitError::Config(ConfigError::IoError {
            message: format!("Failed to parse TOML: {}", e),
        })
    })?;

    // Validate the loaded configuration
    config
        .validate()
        .map_err(|e| OathkitError::Config(ConfigError::ValidationError { message: e }))?;

    debug!(path = %path.as_ref().display(), backend = ?config.storage.backend, "Loaded configuration");
    Ok(config)
}

/// Save configuration to the default TOML file
pub fn save_config(config: &OathConfig) -> Result<(), OathkitError> {
    let config_path = get_config_path()?;
    save_config_to_path(config, &config_path)
}

/// Save configuration to a specific TOML file
pub fn save_config_to_path<P: AsRef<Path>>(config: &OathConfig, path: P) -> Result<(), OathkitError> {
    // Validate configuration before saving
    config
        .validate()
        .map_err(|e| OathkitError::Config(ConfigError::ValidationError { message: e }))?;

    // Ensure config directory exists
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            OathkitError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let contents = toml::to_string_pretty(config)?;

    std::fs::write(&path, contents).map_err(|_e| {
        OathkitError::Config(ConfigError::SaveFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        })
    })?;

    info!("Saved configuration to {:?}", path.as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use tempfile::tempdir;

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut original_config = OathConfig::default();
        original_config.storage.backend = StorageBackend::Keyring;
        original_config.storage.service = "oathkit-test".to_string();
        original_config.service.cache_enabled = false;
        original_config.environment.biometric_available = true;
        original_config.environment.tamper_score = 0.25;

        save_config_to_path(&original_config, &config_path).unwrap();
        let loaded_config = load_config_from_path(&config_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[storage]\nbackend = \"memory\"\n").unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.service.cache_enabled);
        assert!(!config.environment.biometric_available);
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = tempdir().unwrap();
        let result = load_config_from_path(temp_dir.path().join("absent.toml"));
        assert!(matches!(
            result,
            Err(OathkitError::Config(ConfigError::LoadFailed { .. }))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_on_save() {
        let temp_dir = tempdir().unwrap();
        let mut config = OathConfig::default();
        config.environment.tamper_score = -0.1;

        let result = save_config_to_path(&config, temp_dir.path().join("config.toml"));
        assert!(matches!(
            result,
            Err(OathkitError::Config(ConfigError::ValidationError { .. }))
        ));
    }
}
