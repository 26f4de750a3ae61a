//! Device capabilities consulted by policies

use serde::{Deserialize, Serialize};

/// Runtime capabilities of the device a credential lives on
pub trait DeviceEnvironment: Send + Sync {
    /// Whether biometric authentication hardware is present and enrolled
    fn is_biometric_available(&self) -> bool;

    /// Likelihood that the device has been tampered with, in `[0, 1]`
    fn tamper_score(&self) -> f64;
}

/// Fixed capabilities, typically read from the `[environment]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticEnvironment {
    #[serde(default)]
    pub biometric_available: bool,

    #[serde(default)]
    pub tamper_score: f64,
}

impl StaticEnvironment {
    pub fn new(biometric_available: bool, tamper_score: f64) -> Self {
        Self {
            biometric_available,
            tamper_score,
        }
    }

    /// Validate the configured values
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.tamper_score) {
            return Err(format!(
                "tamper_score must be between 0 and 1, got {}",
                self.tamper_score
            ));
        }
        Ok(())
    }
}

impl Default for StaticEnvironment {
    fn default() -> Self {
        Self::new(false, 0.0)
    }
}

impl DeviceEnvironment for StaticEnvironment {
    fn is_biometric_available(&self) -> bool {
        self.biometric_available
    }

    fn tamper_score(&self) -> f64 {
        self.tamper_score
    }
}
