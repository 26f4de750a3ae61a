//! Credential policy evaluation
//!
//! A credential may declare policies as a JSON object keyed by policy name,
//! for example `{"biometricAvailable":{},"deviceTampering":{"score":0.8}}`,
//! either as plain JSON or base64-encoded. Each named policy is a capability
//! predicate evaluated against the [`DeviceEnvironment`]. Policies are walked
//! in registry order and the first failure determines the reported name.
//!
//! Malformed policy data is treated as compliant so that a parse error never
//! blocks a user from their codes.

pub mod environment;
pub mod rules;

use crate::oath::encoding::decode_base64;
use async_trait::async_trait;
use environment::DeviceEnvironment;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of evaluating a credential's policies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyResult {
    non_compliance_policy_name: Option<String>,
}

impl PolicyResult {
    /// Every declared policy is satisfied
    pub fn success() -> Self {
        Self {
            non_compliance_policy_name: None,
        }
    }

    /// The named policy is not satisfied
    pub fn failure(policy: impl Into<String>) -> Self {
        Self {
            non_compliance_policy_name: Some(policy.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.non_compliance_policy_name.is_none()
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Name of the first failing policy
    pub fn non_compliance_policy_name(&self) -> Option<&str> {
        self.non_compliance_policy_name.as_deref()
    }
}

/// A named capability check
pub trait MfaPolicy: Send + Sync {
    /// Key under which the policy appears in a credential's policy JSON
    fn name(&self) -> &str;

    /// Whether the device satisfies the policy given its per-credential data
    fn evaluate(&self, data: &Value, environment: &dyn DeviceEnvironment) -> bool;
}

/// Ordered set of known policies
///
/// Built explicitly at start-up and handed to the evaluator.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    policies: Vec<Arc<dyn MfaPolicy>>,
}

impl PolicyRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in policies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(rules::BiometricAvailablePolicy));
        registry.register(Arc::new(rules::DeviceTamperingPolicy));
        registry
    }

    /// Add a policy; a policy with the same name is replaced in place
    pub fn register(&mut self, policy: Arc<dyn MfaPolicy>) {
        match self.policies.iter().position(|p| p.name() == policy.name()) {
            Some(idx) => self.policies[idx] = policy,
            None => self.policies.push(policy),
        }
    }

    /// Registered policy names in evaluation order
    pub fn names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<dyn MfaPolicy>> {
        self.policies.iter()
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("policies", &self.names())
            .finish()
    }
}

/// Evaluates a credential's declared policies
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    async fn evaluate(&self, credential_policies: Option<&str>) -> PolicyResult;
}

/// Decode policy data given as JSON or base64 of JSON
///
/// Returns `None` when the data is neither, or is not a JSON object.
pub fn decode_policies(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    let value = serde_json::from_str::<Value>(trimmed).ok().or_else(|| {
        decode_base64(trimmed)
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
    })?;

    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Default evaluator backed by a [`PolicyRegistry`] and a [`DeviceEnvironment`]
pub struct MfaPolicyEvaluator {
    registry: PolicyRegistry,
    environment: Arc<dyn DeviceEnvironment>,
}

impl MfaPolicyEvaluator {
    pub fn new(registry: PolicyRegistry, environment: Arc<dyn DeviceEnvironment>) -> Self {
        Self {
            registry,
            environment,
        }
    }

    /// Evaluate synchronously; the async trait method delegates here
    pub fn evaluate_now(&self, credential_policies: Option<&str>) -> PolicyResult {
        let Some(raw) = credential_policies.filter(|p| !p.trim().is_empty()) else {
            return PolicyResult::success();
        };

        let Some(declared) = decode_policies(raw) else {
            warn!("Ignoring malformed credential policies");
            return PolicyResult::success();
        };

        for name in declared.keys() {
            if !self.registry.names().contains(&name.as_str()) {
                debug!(policy = %name, "Credential declares an unknown policy, skipping");
            }
        }

        for policy in self.registry.iter() {
            let Some(data) = declared.get(policy.name()) else {
                continue;
            };
            if !policy.evaluate(data, self.environment.as_ref()) {
                debug!(policy = policy.name(), "Policy not satisfied");
                return PolicyResult::failure(policy.name());
            }
        }

        PolicyResult::success()
    }
}

impl std::fmt::Debug for MfaPolicyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MfaPolicyEvaluator")
            .field("registry", &self.registry)
            .finish()
    }
}

#[async_trait]
impl PolicyEvaluator for MfaPolicyEvaluator {
    async fn evaluate(&self, credential_policies: Option<&str>) -> PolicyResult {
        self.evaluate_now(credential_policies)
    }
}

#[cfg(test)]
mod tests {
    use super::environment::StaticEnvironment;
    use super::rules::{BIOMETRIC_AVAILABLE, DEVICE_TAMPERING};
    use super::*;
    use crate::oath::encoding::encode_base64url;

    fn evaluator(biometric: bool, tamper_score: f64) -> MfaPolicyEvaluator {
        MfaPolicyEvaluator::new(
            PolicyRegistry::with_defaults(),
            Arc::new(StaticEnvironment::new(biometric, tamper_score)),
        )
    }

    #[test]
    fn test_no_policies_is_success() {
        let evaluator = evaluator(false, 1.0);
        assert!(evaluator.evaluate_now(None).is_success());
        assert!(evaluator.evaluate_now(Some("  ")).is_success());
    }

    #[test]
    fn test_malformed_json_fails_open() {
        let evaluator = evaluator(false, 1.0);
        let result = evaluator.evaluate_now(Some("{not json"));
        assert!(result.is_success());
        assert!(!result.is_failure());
        assert!(result.non_compliance_policy_name().is_none());

        assert!(evaluator.evaluate_now(Some("[1,2,3]")).is_success());
    }

    #[test]
    fn test_failing_policy_is_reported() {
        let evaluator = evaluator(false, 0.0);
        let result = evaluator.evaluate_now(Some("{\"biometricAvailable\":{}}"));
        assert!(result.is_failure());
        assert_eq!(result.non_compliance_policy_name(), Some(BIOMETRIC_AVAILABLE));
    }

    #[test]
    fn test_first_failure_in_registry_order_wins() {
        let evaluator = evaluator(false, 0.95);
        let result = evaluator.evaluate_now(Some(
            "{\"deviceTampering\":{\"score\":0.8},\"biometricAvailable\":{}}",
        ));
        assert_eq!(result.non_compliance_policy_name(), Some(BIOMETRIC_AVAILABLE));

        let only_tampering = evaluator.evaluate_now(Some("{\"deviceTampering\":{\"score\":0.8}}"));
        assert_eq!(only_tampering.non_compliance_policy_name(), Some(DEVICE_TAMPERING));
    }

    #[test]
    fn test_base64_policies_are_decoded() {
        let evaluator = evaluator(false, 0.0);
        let encoded = encode_base64url("{\"biometricAvailable\":{}}");
        let result = evaluator.evaluate_now(Some(&encoded));
        assert_eq!(result.non_compliance_policy_name(), Some(BIOMETRIC_AVAILABLE));
    }

    #[test]
    fn test_unknown_policies_are_ignored() {
        let evaluator = evaluator(true, 0.0);
        assert!(evaluator
            .evaluate_now(Some("{\"jailbreakDetection\":{}}"))
            .is_success());
    }

    #[test]
    fn test_register_custom_policy() {
        struct AlwaysFails;
        impl MfaPolicy for AlwaysFails {
            fn name(&self) -> &str {
                "alwaysFails"
            }
            fn evaluate(&self, _data: &Value, _env: &dyn DeviceEnvironment) -> bool {
                false
            }
        }

        let mut registry = PolicyRegistry::with_defaults();
        registry.register(Arc::new(AlwaysFails));
        assert_eq!(
            registry.names(),
            vec![BIOMETRIC_AVAILABLE, DEVICE_TAMPERING, "alwaysFails"]
        );

        let evaluator =
            MfaPolicyEvaluator::new(registry, Arc::new(StaticEnvironment::new(true, 0.0)));
        let result = evaluator.evaluate_now(Some("{\"alwaysFails\":{}}"));
        assert_eq!(result.non_compliance_policy_name(), Some("alwaysFails"));
    }

    #[tokio::test]
    async fn test_async_evaluate_delegates() {
        let evaluator = evaluator(true, 0.0);
        let result = PolicyEvaluator::evaluate(&evaluator, Some("{\"biometricAvailable\":{}}")).await;
        assert!(result.is_success());
    }
}
