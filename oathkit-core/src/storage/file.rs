//! JSON file credential storage
//!
//! The whole credential map is kept in a single JSON document. Every
//! mutation rewrites the file through a temporary sibling and a rename so a
//! crash never leaves a half-written store behind.

use crate::error::StorageError;
use crate::storage::CredentialStorage;
use crate::types::OathCredential;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

type CredentialMap = BTreeMap<String, OathCredential>;

/// Credentials persisted to a JSON file
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<CredentialMap, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CredentialMap::new()),
            Err(e) => {
                return Err(StorageError::Io {
                    reason: format!("Failed to read {}: {}", self.path.display(), e),
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(CredentialMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| StorageError::Serialization {
            reason: format!("{}: {}", self.path.display(), e),
        })
    }

    async fn save(&self, credentials: &CredentialMap) -> Result<(), StorageError> {
        let io_error = |action: &str, e: std::io::Error| StorageError::Io {
            reason: format!("Failed to {} {}: {}", action, self.path.display(), e),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory for", e))?;
        }

        let contents =
            serde_json::to_vec_pretty(credentials).map_err(|e| StorageError::Serialization {
                reason: e.to_string(),
            })?;

        let temp_path = self.path.with_extension("json.tmp");
        write_private(&temp_path, &contents)
            .await
            .map_err(|e| io_error("write", e))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| io_error("replace", e))?;

        debug!(path = %self.path.display(), count = credentials.len(), "Saved credential file");
        Ok(())
    }
}

/// Write `contents` to a freshly created file readable only by its owner
///
/// A leftover file at `path` is removed first so its permissions are not
/// inherited.
async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[async_trait]
impl CredentialStorage for FileStorage {
    async fn store_oath_credential(
        &self,
        credential: &OathCredential,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut credentials = self.load().await?;
        credentials.insert(credential.id.clone(), credential.clone());
        self.save(&credentials).await
    }

    async fn get_all_oath_credentials(&self) -> Result<Vec<OathCredential>, StorageError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.load().await?.into_values().collect())
    }

    async fn retrieve_oath_credential(
        &self,
        id: &str,
    ) -> Result<Option<OathCredential>, StorageError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.load().await?.remove(id))
    }

    async fn remove_oath_credential(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut credentials = self.load().await?;
        if credentials.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&credentials).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OathType;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("credentials.json");
        let storage = FileStorage::new(&path);

        assert!(storage.get_all_oath_credentials().await.unwrap().is_empty());

        let mut credential =
            OathCredential::new("Acme", "alice", OathType::Totp, "JBSWY3DPEHPK3PXP");
        credential.lock("biometricAvailable");
        storage.store_oath_credential(&credential).await.unwrap();
        assert!(path.exists());

        // A fresh handle on the same file sees the stored data
        let reopened = FileStorage::new(&path);
        let loaded = reopened
            .retrieve_oath_credential("Acme-alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, credential);

        assert!(reopened.remove_oath_credential("Acme-alice").await.unwrap());
        assert!(!reopened.remove_oath_credential("Acme-alice").await.unwrap());
        assert!(storage.get_all_oath_credentials().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get_all_oath_credentials().await,
            Err(StorageError::Serialization { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("credentials.json");
        let storage = FileStorage::new(&path);
        let credential = OathCredential::new("Acme", "bob", OathType::Totp, "JBSWY3DPEHPK3PXP");
        storage.store_oath_credential(&credential).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_leftover_temp_file_is_not_reused() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("credentials.json");
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, "stale").unwrap();
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileStorage::new(&path);
        let credential = OathCredential::new("Acme", "bob", OathType::Totp, "JBSWY3DPEHPK3PXP");
        storage.store_oath_credential(&credential).await.unwrap();

        assert!(!temp_path.exists());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(storage.get_all_oath_credentials().await.unwrap().len(), 1);
    }
}
