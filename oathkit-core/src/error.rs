//! Error types for the oathkit credential engine
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// Main error type for the oathkit application
#[derive(Error, Debug)]
pub enum OathkitError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised by the OATH credential engine
    #[error("OATH error: {0}")]
    Oath(#[from] OathError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl From<StorageError> for OathkitError {
    fn from(err: StorageError) -> Self {
        OathkitError::Oath(OathError::Storage(err))
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Credential store errors
///
/// These are opaque to the OATH service and always propagated unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Credential storage unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Failed to store credential: {reason}")]
    StoreFailed { reason: String },

    #[error("Failed to retrieve credential: {reason}")]
    RetrieveFailed { reason: String },

    #[error("Failed to remove credential: {reason}")]
    RemoveFailed { reason: String },

    #[error("Stored credential is malformed: {reason}")]
    Serialization { reason: String },

    #[error("Storage I/O error: {reason}")]
    Io { reason: String },
}

/// OATH credential engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OathError {
    #[error("Invalid OATH URI: {reason}")]
    InvalidUri { reason: String },

    #[error("Missing required parameter: {parameter}")]
    MissingRequiredParameter { parameter: String },

    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidParameterValue { parameter: String, reason: String },

    #[error("Issuer mismatch: label issuer '{label_issuer}' does not match issuer parameter '{query_issuer}'")]
    IssuerMismatch {
        label_issuer: String,
        query_issuer: String,
    },

    #[error("Credential {credential_id} violates policy '{policy}'")]
    PolicyViolation {
        policy: String,
        credential_id: String,
    },

    #[error("Credential not found: {credential_id}")]
    CredentialNotFound { credential_id: String },

    #[error("Credential {credential_id} is locked by policy '{policy}'")]
    CredentialLocked {
        credential_id: String,
        policy: String,
    },

    #[error("Code generation failed: {reason}")]
    CodeGenerationFailed { reason: String },

    #[error("Invalid credential: {reason}")]
    InvalidCredential { reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl OathError {
    /// Whether the error stems from caller input rather than runtime state
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            OathError::InvalidUri { .. }
                | OathError::MissingRequiredParameter { .. }
                | OathError::InvalidParameterValue { .. }
                | OathError::IssuerMismatch { .. }
                | OathError::PolicyViolation { .. }
                | OathError::InvalidCredential { .. }
        )
    }
}
