//! Public entry point to the OATH engine
//!
//! `OathClient` delegates every call to [`OathService`] and logs the outcome.
//! Secrets and generated codes never appear in the log output.

use crate::config::{OathConfig, StorageBackend};
use crate::error::OathError;
use crate::oath::service::{OathConfiguration, OathService};
use crate::policy::{MfaPolicyEvaluator, PolicyEvaluator, PolicyRegistry};
use crate::storage::{CredentialStorage, FileStorage, InMemoryStorage, KeyringStorage};
use crate::types::{OathCodeInfo, OathCredential};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Log a failed operation and hand the error back
fn log_failure(operation: &str, err: OathError) -> OathError {
    if err.is_input_error() {
        info!(operation, error = %err, "OATH operation rejected");
    } else {
        error!(operation, error = %err, "OATH operation failed");
    }
    err
}

/// Façade over the OATH service
#[derive(Debug)]
pub struct OathClient {
    service: OathService,
}

impl OathClient {
    pub fn new(configuration: OathConfiguration) -> Self {
        Self {
            service: OathService::new(configuration),
        }
    }

    /// Build a client with the storage, cache and policy environment from `config`
    ///
    /// `config_dir` anchors the default credential file location.
    pub fn from_config(config: &OathConfig, config_dir: &Path) -> Self {
        let storage: Arc<dyn CredentialStorage> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryStorage::new()),
            StorageBackend::File => Arc::new(FileStorage::new(config.storage.file_path(config_dir))),
            StorageBackend::Keyring => Arc::new(KeyringStorage::new(config.storage.service.clone())),
        };
        let policy_evaluator: Arc<dyn PolicyEvaluator> = Arc::new(MfaPolicyEvaluator::new(
            PolicyRegistry::with_defaults(),
            Arc::new(config.environment.clone()),
        ));

        debug!(backend = ?config.storage.backend, cache = config.service.cache_enabled, "Creating OATH client");
        Self::new(OathConfiguration {
            storage,
            policy_evaluator,
            enable_credential_cache: config.service.cache_enabled,
        })
    }

    /// Parse a registration URI and persist the resulting credential
    pub async fn add_credential_from_uri(&self, uri: &str) -> Result<OathCredential, OathError> {
        debug!("Adding credential from URI");
        let credential = self
            .service
            .parse_uri(uri)
            .await
            .map_err(|e| log_failure("add_credential_from_uri", e))?;
        let stored = self
            .service
            .add_credential(credential)
            .await
            .map_err(|e| log_failure("add_credential_from_uri", e))?;
        info!(credential_id = %stored.id, "Registered credential");
        Ok(stored)
    }

    /// Persist a programmatically built credential
    pub async fn save_credential(
        &self,
        credential: OathCredential,
    ) -> Result<OathCredential, OathError> {
        debug!(credential_id = %credential.id, "Saving credential");
        self.service
            .add_credential(credential)
            .await
            .map_err(|e| log_failure("save_credential", e))
    }

    pub async fn get_credentials(&self) -> Result<Vec<OathCredential>, OathError> {
        debug!("Listing credentials");
        self.service
            .get_credentials()
            .await
            .map_err(|e| log_failure("get_credentials", e))
    }

    pub async fn get_credential(&self, id: &str) -> Result<Option<OathCredential>, OathError> {
        debug!(credential_id = %id, "Fetching credential");
        self.service
            .get_credential(id)
            .await
            .map_err(|e| log_failure("get_credential", e))
    }

    pub async fn delete_credential(&self, id: &str) -> Result<bool, OathError> {
        debug!(credential_id = %id, "Deleting credential");
        self.service
            .remove_credential(id)
            .await
            .map_err(|e| log_failure("delete_credential", e))
    }

    /// Generate a code and return only its digits
    pub async fn generate_code(&self, id: &str) -> Result<String, OathError> {
        self.generate_code_with_validity(id)
            .await
            .map(|info| info.code().to_string())
    }

    /// Generate a code together with its validity window or counter
    pub async fn generate_code_with_validity(&self, id: &str) -> Result<OathCodeInfo, OathError> {
        debug!(credential_id = %id, "Generating code");
        let info = self
            .service
            .generate_code_for_credential(id)
            .await
            .map_err(|e| log_failure("generate_code", e))?;
        debug!(credential_id = %id, oath_type = %info.oath_type, "Generated code");
        Ok(info)
    }

    /// Release cached credentials
    pub async fn close(&self) {
        self.service.clear_cache().await;
        debug!("OATH client closed");
    }
}
