//! OATH credential orchestration
//!
//! The service ties together URI parsing, policy evaluation, storage and
//! code generation. Every operation holds the service mutex for its whole
//! duration so that the "read credential, evaluate policy, persist lock
//! state" sequence cannot interleave between concurrent callers.
//!
//! Policies are enforced twice with different strictness: a non-compliant
//! credential is rejected outright at registration, while a stored credential
//! that later becomes non-compliant is locked on read instead of removed.

use crate::error::OathError;
use crate::oath::{algorithm, uri};
use crate::policy::{PolicyEvaluator, PolicyResult};
use crate::storage::CredentialStorage;
use crate::types::{OathCodeInfo, OathCredential, OathType};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Collaborators and switches for an [`OathService`]
#[derive(Clone)]
pub struct OathConfiguration {
    pub storage: Arc<dyn CredentialStorage>,
    pub policy_evaluator: Arc<dyn PolicyEvaluator>,
    pub enable_credential_cache: bool,
}

/// Change a policy evaluation makes to a credential's lock state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTransition {
    /// Lock state already reflects the evaluation
    Unchanged,
    /// Unlocked credential failed the named policy
    Lock(String),
    /// Locked credential now satisfies every policy
    Unlock,
    /// Locked credential now fails a different policy
    Relock(String),
}

impl LockTransition {
    /// Decide the transition for a credential given a fresh evaluation
    pub fn evaluate(credential: &OathCredential, result: &PolicyResult) -> Self {
        match (credential.is_locked, result.non_compliance_policy_name()) {
            (false, None) => LockTransition::Unchanged,
            (false, Some(policy)) => LockTransition::Lock(policy.to_string()),
            (true, None) => LockTransition::Unlock,
            (true, Some(policy)) if credential.locking_policy.as_deref() == Some(policy) => {
                LockTransition::Unchanged
            }
            (true, Some(policy)) => LockTransition::Relock(policy.to_string()),
        }
    }

    /// Apply the transition; returns whether the credential changed
    pub fn apply(self, credential: &mut OathCredential) -> bool {
        match self {
            LockTransition::Unchanged => false,
            LockTransition::Lock(policy) => {
                info!(credential_id = %credential.id, policy = %policy, "Locking credential");
                credential.lock(policy);
                true
            }
            LockTransition::Relock(policy) => {
                info!(credential_id = %credential.id, policy = %policy, "Credential locked by a different policy");
                credential.lock(policy);
                true
            }
            LockTransition::Unlock => {
                info!(credential_id = %credential.id, "Unlocking credential");
                credential.unlock();
                true
            }
        }
    }
}

/// Orchestrates OATH credential lifecycle and code generation
pub struct OathService {
    storage: Arc<dyn CredentialStorage>,
    policy_evaluator: Arc<dyn PolicyEvaluator>,
    cache_enabled: bool,
    credentials_cache: Mutex<HashMap<String, OathCredential>>,
}

impl OathService {
    pub fn new(configuration: OathConfiguration) -> Self {
        Self {
            storage: configuration.storage,
            policy_evaluator: configuration.policy_evaluator,
            cache_enabled: configuration.enable_credential_cache,
            credentials_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a registration URI, rejecting credentials that violate their policies
    pub async fn parse_uri(&self, uri: &str) -> Result<OathCredential, OathError> {
        let credential = uri::parse_uri(uri)?;

        if credential.has_policies() {
            let result = self
                .policy_evaluator
                .evaluate(credential.policies.as_deref())
                .await;
            if let Some(policy) = result.non_compliance_policy_name() {
                info!(credential_id = %credential.id, policy = %policy, "Rejecting credential registration");
                return Err(OathError::PolicyViolation {
                    policy: policy.to_string(),
                    credential_id: credential.id.clone(),
                });
            }
        }

        Ok(credential)
    }

    /// Validate, lock if non-compliant, and persist a credential
    ///
    /// Re-adding the same issuer/account pair replaces the stored record. A
    /// different pair that derives the same id is rejected.
    pub async fn add_credential(
        &self,
        mut credential: OathCredential,
    ) -> Result<OathCredential, OathError> {
        let mut cache = self.credentials_cache.lock().await;

        credential.validate()?;
        if let Some(existing) = self.storage.retrieve_oath_credential(&credential.id).await? {
            if existing.issuer != credential.issuer
                || existing.account_name != credential.account_name
            {
                return Err(OathError::InvalidCredential {
                    reason: format!(
                        "id '{}' already belongs to issuer '{}' account '{}'",
                        credential.id, existing.issuer, existing.account_name
                    ),
                });
            }
        }
        self.apply_policy_state(&mut credential).await;
        self.storage.store_oath_credential(&credential).await?;

        if self.cache_enabled {
            cache.insert(credential.id.clone(), credential.clone());
        }
        info!(credential_id = %credential.id, oath_type = %credential.oath_type, locked = credential.is_locked, "Stored credential");
        Ok(credential)
    }

    /// All stored credentials with their lock state brought up to date
    ///
    /// Always reads from storage; the cache is only refreshed.
    pub async fn get_credentials(&self) -> Result<Vec<OathCredential>, OathError> {
        let mut cache = self.credentials_cache.lock().await;

        let mut credentials = self.storage.get_all_oath_credentials().await?;
        for credential in credentials.iter_mut() {
            self.evaluate_and_update_credential_policies(credential)
                .await?;
        }

        if self.cache_enabled {
            for credential in &credentials {
                cache.insert(credential.id.clone(), credential.clone());
            }
        }
        debug!(count = credentials.len(), "Loaded credentials");
        Ok(credentials)
    }

    /// A single credential with its lock state brought up to date
    pub async fn get_credential(&self, id: &str) -> Result<Option<OathCredential>, OathError> {
        let mut cache = self.credentials_cache.lock().await;
        self.load_credential(&mut cache, id).await
    }

    /// Remove a credential from storage and the cache
    pub async fn remove_credential(&self, id: &str) -> Result<bool, OathError> {
        let mut cache = self.credentials_cache.lock().await;

        let removed = self.storage.remove_oath_credential(id).await?;
        cache.remove(id);
        info!(credential_id = %id, removed, "Removed credential");
        Ok(removed)
    }

    /// Generate the current code for a credential
    ///
    /// HOTP counters are advanced and persisted only after the code was
    /// produced, so a failed attempt never burns a counter value.
    pub async fn generate_code_for_credential(
        &self,
        id: &str,
    ) -> Result<OathCodeInfo, OathError> {
        let mut cache = self.credentials_cache.lock().await;

        let mut credential = self
            .load_credential(&mut cache, id)
            .await?
            .ok_or_else(|| OathError::CredentialNotFound {
                credential_id: id.to_string(),
            })?;

        if credential.is_locked {
            return Err(OathError::CredentialLocked {
                credential_id: credential.id.clone(),
                policy: credential.locking_policy.clone().unwrap_or_default(),
            });
        }

        let now = algorithm::unix_now()?;
        let code_info = algorithm::generate_code_at(&credential, now)?;

        if credential.oath_type == OathType::Hotp {
            credential.counter = credential.counter.checked_add(1).ok_or_else(|| {
                OathError::CodeGenerationFailed {
                    reason: "HOTP counter is exhausted".to_string(),
                }
            })?;
            self.storage.store_oath_credential(&credential).await?;
            debug!(credential_id = %credential.id, counter = credential.counter, "Advanced HOTP counter");
            if self.cache_enabled {
                cache.insert(credential.id.clone(), credential);
            }
        }

        Ok(code_info)
    }

    /// Drop every cached credential
    pub async fn clear_cache(&self) {
        self.credentials_cache.lock().await.clear();
        debug!("Cleared credential cache");
    }

    /// Re-evaluate a credential's policies and persist any lock change
    ///
    /// Returns whether the credential's lock state changed.
    pub async fn evaluate_and_update_credential_policies(
        &self,
        credential: &mut OathCredential,
    ) -> Result<bool, OathError> {
        if !self.apply_policy_state(credential).await {
            return Ok(false);
        }
        self.storage.store_oath_credential(credential).await?;
        Ok(true)
    }

    async fn apply_policy_state(&self, credential: &mut OathCredential) -> bool {
        let result = self
            .policy_evaluator
            .evaluate(credential.policies.as_deref())
            .await;
        LockTransition::evaluate(credential, &result).apply(credential)
    }

    async fn load_credential(
        &self,
        cache: &mut HashMap<String, OathCredential>,
        id: &str,
    ) -> Result<Option<OathCredential>, OathError> {
        let cached = if self.cache_enabled {
            cache.get(id).cloned()
        } else {
            None
        };

        let mut credential = match cached {
            Some(credential) => credential,
            None => match self.storage.retrieve_oath_credential(id).await? {
                Some(credential) => credential,
                None => return Ok(None),
            },
        };

        self.evaluate_and_update_credential_policies(&mut credential)
            .await?;

        if self.cache_enabled {
            cache.insert(credential.id.clone(), credential.clone());
        }
        Ok(Some(credential))
    }
}

impl std::fmt::Debug for OathService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OathService")
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> OathCredential {
        OathCredential::new("Acme", "alice", OathType::Totp, "JBSWY3DPEHPK3PXP")
    }

    #[test]
    fn test_unlocked_and_compliant_is_unchanged() {
        let credential = credential();
        assert_eq!(
            LockTransition::evaluate(&credential, &PolicyResult::success()),
            LockTransition::Unchanged
        );
    }

    #[test]
    fn test_unlocked_and_failing_locks() {
        let mut credential = credential();
        let transition =
            LockTransition::evaluate(&credential, &PolicyResult::failure("biometricAvailable"));
        assert_eq!(
            transition,
            LockTransition::Lock("biometricAvailable".to_string())
        );
        assert!(transition.apply(&mut credential));
        assert!(credential.is_locked);
        assert_eq!(credential.locking_policy.as_deref(), Some("biometricAvailable"));
    }

    #[test]
    fn test_locked_and_compliant_unlocks() {
        let mut credential = credential();
        credential.lock("biometricAvailable");
        let transition = LockTransition::evaluate(&credential, &PolicyResult::success());
        assert_eq!(transition, LockTransition::Unlock);
        assert!(transition.apply(&mut credential));
        assert!(!credential.is_locked);
        assert!(credential.locking_policy.is_none());
    }

    #[test]
    fn test_locked_by_same_policy_is_unchanged() {
        let mut credential = credential();
        credential.lock("deviceTampering");
        let transition =
            LockTransition::evaluate(&credential, &PolicyResult::failure("deviceTampering"));
        assert_eq!(transition, LockTransition::Unchanged);
        assert!(!transition.apply(&mut credential));
    }

    #[test]
    fn test_locked_by_different_policy_relocks() {
        let mut credential = credential();
        credential.lock("deviceTampering");
        let transition =
            LockTransition::evaluate(&credential, &PolicyResult::failure("biometricAvailable"));
        assert_eq!(
            transition,
            LockTransition::Relock("biometricAvailable".to_string())
        );
        assert!(transition.apply(&mut credential));
        assert!(credential.is_locked);
        assert_eq!(credential.locking_policy.as_deref(), Some("biometricAvailable"));
    }
}
