//! Credential persistence
//!
//! The OATH service only sees the [`CredentialStorage`] trait. Three backends
//! are provided: an in-memory map, a JSON file, and the system keyring.

pub mod file;
pub mod keyring;
pub mod memory;

// Use mock secret store in test mode or CI environment
#[cfg(any(test, feature = "mock-keyring"))]
#[path = "secret_store_mock.rs"]
pub mod secret_store;

// Use the system keyring in production
#[cfg(not(any(test, feature = "mock-keyring")))]
pub mod secret_store;

use crate::error::StorageError;
use crate::types::OathCredential;
use async_trait::async_trait;

pub use self::file::FileStorage;
pub use self::keyring::{KeyringStorage, DEFAULT_KEYRING_SERVICE};
pub use self::memory::InMemoryStorage;

/// CRUD access to persisted OATH credentials
///
/// Storing a credential whose id already exists overwrites it.
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Insert or replace a credential
    async fn store_oath_credential(&self, credential: &OathCredential)
        -> Result<(), StorageError>;

    /// Every stored credential, ordered by id
    async fn get_all_oath_credentials(&self) -> Result<Vec<OathCredential>, StorageError>;

    /// The credential with `id`, if any
    async fn retrieve_oath_credential(
        &self,
        id: &str,
    ) -> Result<Option<OathCredential>, StorageError>;

    /// Remove a credential; `false` when nothing was stored under `id`
    async fn remove_oath_credential(&self, id: &str) -> Result<bool, StorageError>;
}

/// Deserialize one stored credential
pub(crate) fn decode_credential(raw: &str) -> Result<OathCredential, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })
}

/// Serialize one credential for storage
pub(crate) fn encode_credential(credential: &OathCredential) -> Result<String, StorageError> {
    serde_json::to_string(credential).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })
}
