//! Keyring-backed credential storage
//!
//! Each credential is stored as JSON under `credential:<id>`. Keyrings cannot
//! list their entries, so an index entry holds the ids of every stored
//! credential. The prefix keeps credential ids out of the index's namespace.

use crate::error::StorageError;
use crate::storage::{decode_credential, encode_credential, secret_store, CredentialStorage};
use crate::types::OathCredential;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Default keyring service name
pub const DEFAULT_KEYRING_SERVICE: &str = "oathkit";

const INDEX_ACCOUNT: &str = "__index__";
const CREDENTIAL_ACCOUNT_PREFIX: &str = "credential:";

fn credential_account(id: &str) -> String {
    format!("{}{}", CREDENTIAL_ACCOUNT_PREFIX, id)
}

/// Credentials stored in the system keyring
#[derive(Debug)]
pub struct KeyringStorage {
    service: String,
    index_lock: Mutex<()>,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            index_lock: Mutex::new(()),
        }
    }

    /// Run a keyring call off the async executor
    async fn blocking<T, F>(&self, call: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(String) -> Result<T, StorageError> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || call(service))
            .await
            .map_err(|e| StorageError::ServiceUnavailable {
                reason: format!("keyring task failed: {}", e),
            })?
    }

    async fn read_index(&self) -> Result<Vec<String>, StorageError> {
        let raw = self
            .blocking(|service| secret_store::get_secret(&service, INDEX_ACCOUNT))
            .await?;
        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Serialization {
                reason: format!("credential index: {}", e),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, ids: Vec<String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&ids).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;
        self.blocking(move |service| secret_store::set_secret(&service, INDEX_ACCOUNT, &raw))
            .await
    }

    async fn read_credential(&self, id: &str) -> Result<Option<OathCredential>, StorageError> {
        let account = credential_account(id);
        let raw = self
            .blocking(move |service| secret_store::get_secret(&service, &account))
            .await?;
        raw.as_deref().map(decode_credential).transpose()
    }
}

#[async_trait]
impl CredentialStorage for KeyringStorage {
    async fn store_oath_credential(
        &self,
        credential: &OathCredential,
    ) -> Result<(), StorageError> {
        let _guard = self.index_lock.lock().await;

        let raw = encode_credential(credential)?;
        let account = credential_account(&credential.id);
        self.blocking(move |service| secret_store::set_secret(&service, &account, &raw))
            .await?;

        let mut ids = self.read_index().await?;
        if !ids.contains(&credential.id) {
            ids.push(credential.id.clone());
            ids.sort();
            self.write_index(ids).await?;
        }

        debug!(service = %self.service, credential_id = %credential.id, "Stored credential in keyring");
        Ok(())
    }

    async fn get_all_oath_credentials(&self) -> Result<Vec<OathCredential>, StorageError> {
        let _guard = self.index_lock.lock().await;

        let mut credentials = Vec::new();
        for id in self.read_index().await? {
            match self.read_credential(&id).await? {
                Some(credential) => credentials.push(credential),
                None => warn!(credential_id = %id, "Indexed credential missing from keyring"),
            }
        }
        Ok(credentials)
    }

    async fn retrieve_oath_credential(
        &self,
        id: &str,
    ) -> Result<Option<OathCredential>, StorageError> {
        self.read_credential(id).await
    }

    async fn remove_oath_credential(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.index_lock.lock().await;

        let account = credential_account(id);
        let removed = self
            .blocking(move |service| secret_store::delete_secret(&service, &account))
            .await?;

        let mut ids = self.read_index().await?;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() != before {
            self.write_index(ids).await?;
        }

        Ok(removed)
    }
}
