//! In-process credential storage

use crate::error::StorageError;
use crate::storage::CredentialStorage;
use crate::types::OathCredential;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Credentials held in memory for the lifetime of the value
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    credentials: RwLock<BTreeMap<String, OathCredential>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStorage for InMemoryStorage {
    async fn store_oath_credential(
        &self,
        credential: &OathCredential,
    ) -> Result<(), StorageError> {
        self.credentials
            .write()
            .await
            .insert(credential.id.clone(), credential.clone());
        Ok(())
    }

    async fn get_all_oath_credentials(&self) -> Result<Vec<OathCredential>, StorageError> {
        Ok(self.credentials.read().await.values().cloned().collect())
    }

    async fn retrieve_oath_credential(
        &self,
        id: &str,
    ) -> Result<Option<OathCredential>, StorageError> {
        Ok(self.credentials.read().await.get(id).cloned())
    }

    async fn remove_oath_credential(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.credentials.write().await.remove(id).is_some())
    }
}
