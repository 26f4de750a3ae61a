//! Built-in credential policies

use crate::policy::environment::DeviceEnvironment;
use crate::policy::MfaPolicy;
use serde_json::Value;

/// Name of the biometric availability policy
pub const BIOMETRIC_AVAILABLE: &str = "biometricAvailable";
/// Name of the device tampering policy
pub const DEVICE_TAMPERING: &str = "deviceTampering";

/// Tamper score above which a device is considered compromised
pub const DEFAULT_TAMPER_THRESHOLD: f64 = 0.8;

/// Requires biometric hardware on the device
#[derive(Debug, Default)]
pub struct BiometricAvailablePolicy;

impl MfaPolicy for BiometricAvailablePolicy {
    fn name(&self) -> &str {
        BIOMETRIC_AVAILABLE
    }

    fn evaluate(&self, _data: &Value, environment: &dyn DeviceEnvironment) -> bool {
        environment.is_biometric_available()
    }
}

/// Rejects devices whose tamper score exceeds the policy threshold
///
/// The threshold is read from the policy data (`{"score": 0.8}`) and falls
/// back to [`DEFAULT_TAMPER_THRESHOLD`].
#[derive(Debug, Default)]
pub struct DeviceTamperingPolicy;

impl MfaPolicy for DeviceTamperingPolicy {
    fn name(&self) -> &str {
        DEVICE_TAMPERING
    }

    fn evaluate(&self, data: &Value, environment: &dyn DeviceEnvironment) -> bool {
        let threshold = data
            .get("score")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_TAMPER_THRESHOLD);
        environment.tamper_score() <= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::environment::StaticEnvironment;
    use serde_json::json;

    #[test]
    fn test_biometric_policy() {
        let policy = BiometricAvailablePolicy;
        assert!(policy.evaluate(&json!({}), &StaticEnvironment::new(true, 0.0)));
        assert!(!policy.evaluate(&json!({}), &StaticEnvironment::new(false, 0.0)));
    }

    #[test]
    fn test_tampering_policy_uses_threshold() {
        let policy = DeviceTamperingPolicy;
        let env = StaticEnvironment::new(false, 0.5);
        assert!(policy.evaluate(&json!({"score": 0.5}), &env));
        assert!(!policy.evaluate(&json!({"score": 0.4}), &env));
    }

    #[test]
    fn test_tampering_policy_default_threshold() {
        let policy = DeviceTamperingPolicy;
        assert!(policy.evaluate(&json!({}), &StaticEnvironment::new(false, 0.8)));
        assert!(!policy.evaluate(&json!({}), &StaticEnvironment::new(false, 0.9)));
    }
}
