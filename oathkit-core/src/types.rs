//! Type definitions and wrappers for secure data handling
//!
//! This module provides the OATH credential record, its algorithm parameters,
//! and type-safe wrappers for sensitive data using the secrecy crate to
//! prevent accidental exposure in logs or debug output.

use crate::error::OathError;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default number of digits in a generated code
pub const DEFAULT_DIGITS: u32 = 6;
/// Smallest accepted code length
pub const MIN_DIGITS: u32 = 4;
/// Largest accepted code length
pub const MAX_DIGITS: u32 = 8;
/// Default TOTP time step in seconds
pub const DEFAULT_PERIOD: u32 = 30;
/// Largest accepted TOTP time step in seconds
pub const MAX_PERIOD: u32 = 300;
/// Largest accepted shared secret, in characters
pub const MAX_SECRET_LENGTH: usize = 1024;

/// OATH credential flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OathType {
    /// Time-based (RFC 6238)
    Totp,
    /// Counter-based (RFC 4226)
    Hotp,
}

impl OathType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OathType::Totp => "totp",
            OathType::Hotp => "hotp",
        }
    }
}

impl fmt::Display for OathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OathType {
    type Err = OathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "totp" => Ok(OathType::Totp),
            "hotp" => Ok(OathType::Hotp),
            other => Err(OathError::InvalidUri {
                reason: format!("unsupported OATH type '{}'", other),
            }),
        }
    }
}

/// HMAC hash algorithm used for code generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OathAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl OathAlgorithm {
    /// Canonical spelling used in `algorithm=` URI parameters
    pub fn as_uri_value(&self) -> &'static str {
        match self {
            OathAlgorithm::Sha1 => "SHA1",
            OathAlgorithm::Sha256 => "SHA256",
            OathAlgorithm::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for OathAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_uri_value())
    }
}

impl FromStr for OathAlgorithm {
    type Err = OathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA1" => Ok(OathAlgorithm::Sha1),
            "SHA256" => Ok(OathAlgorithm::Sha256),
            "SHA512" => Ok(OathAlgorithm::Sha512),
            other => Err(OathError::InvalidParameterValue {
                parameter: "algorithm".to_string(),
                reason: format!("unsupported algorithm '{}'", other),
            }),
        }
    }
}

/// Wrapper for the shared OATH secret
///
/// This type ensures secrets are never accidentally logged or exposed
/// in debug output. It serializes as a plain string so that credential
/// stores can persist it.
#[derive(Clone, Debug)]
pub struct OathSecret(Secret<String>);

impl OathSecret {
    /// Create a new OathSecret from its encoded form
    pub fn new(secret: String) -> Self {
        Self(Secret::new(secret))
    }

    /// Expose the secret value (use with caution!)
    ///
    /// This should only be called when absolutely necessary,
    /// such as when passing to cryptographic functions or formatting a URI.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for OathSecret {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl From<String> for OathSecret {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl Serialize for OathSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for OathSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(OathSecret::new)
    }
}

/// One enrolled OATH secret together with its display and governance data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OathCredential {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub issuer: String,
    pub display_issuer: String,
    pub account_name: String,
    pub display_account_name: String,
    #[serde(default, rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub oath_type: OathType,
    pub oath_algorithm: OathAlgorithm,
    pub digits: u32,
    pub period: u32,
    pub counter: u64,
    secret_key: OathSecret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locking_policy: Option<String>,
}

impl OathCredential {
    /// Create a credential with default algorithm parameters
    ///
    /// The id is derived from issuer and account name; display names start
    /// out equal to their canonical counterparts.
    pub fn new(
        issuer: impl Into<String>,
        account_name: impl Into<String>,
        oath_type: OathType,
        secret: impl Into<String>,
    ) -> Self {
        let issuer = issuer.into();
        let account_name = account_name.into();
        Self {
            id: Self::derive_id(&issuer, &account_name),
            user_id: None,
            resource_id: None,
            display_issuer: issuer.clone(),
            display_account_name: account_name.clone(),
            issuer,
            account_name,
            image_url: None,
            background_color: None,
            oath_type,
            oath_algorithm: OathAlgorithm::default(),
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            counter: 0,
            secret_key: OathSecret::new(secret.into()),
            policies: None,
            is_locked: false,
            locking_policy: None,
        }
    }

    /// Stable identifier for an issuer/account pair
    pub fn derive_id(issuer: &str, account_name: &str) -> String {
        if issuer.is_empty() {
            account_name.to_string()
        } else {
            format!("{}-{}", issuer, account_name)
        }
    }

    /// The shared secret; immutable once the credential exists
    pub fn secret(&self) -> &OathSecret {
        &self.secret_key
    }

    /// Check the structural invariants of the record
    pub fn validate(&self) -> Result<(), OathError> {
        let invalid = |reason: String| Err(OathError::InvalidCredential { reason });

        if self.id.trim().is_empty() {
            return invalid("id cannot be empty".to_string());
        }
        let secret = self.secret_key.expose();
        if secret.is_empty() {
            return invalid("secret cannot be empty".to_string());
        }
        if secret.chars().count() > MAX_SECRET_LENGTH {
            return invalid(format!(
                "secret exceeds {} characters",
                MAX_SECRET_LENGTH
            ));
        }
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&self.digits) {
            return invalid(format!(
                "digits must be between {} and {}, got {}",
                MIN_DIGITS, MAX_DIGITS, self.digits
            ));
        }
        if self.oath_type == OathType::Totp && !(1..=MAX_PERIOD).contains(&self.period) {
            return invalid(format!(
                "period must be between 1 and {} seconds, got {}",
                MAX_PERIOD, self.period
            ));
        }
        if self.is_locked && self.locking_policy.is_none() {
            return invalid("locked credential must name its locking policy".to_string());
        }
        Ok(())
    }

    /// Whether the credential declares any policy requirements
    pub fn has_policies(&self) -> bool {
        self.policies.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// Mark the credential as locked by the named policy
    pub fn lock(&mut self, policy: impl Into<String>) {
        self.is_locked = true;
        self.locking_policy = Some(policy.into());
    }

    /// Clear any lock on the credential
    pub fn unlock(&mut self) {
        self.is_locked = false;
        self.locking_policy = None;
    }
}

/// Result of a single code generation
///
/// Ephemeral; never persisted. The code itself is kept behind `Secret` so it
/// does not end up in debug output.
#[derive(Clone, Debug)]
pub struct OathCodeInfo {
    code: Secret<String>,
    /// Credential flavour the code was generated for
    pub oath_type: OathType,
    /// Length of the code
    pub digits: u32,
    /// Counter value consumed (HOTP only)
    pub counter: Option<u64>,
    /// Time step in seconds (TOTP only)
    pub period: Option<u32>,
    /// Unix time at which the code was generated
    pub generated_at: u64,
    /// Unix time at which the current TOTP window closes
    pub valid_until: Option<u64>,
}

impl OathCodeInfo {
    pub(crate) fn totp(code: String, digits: u32, period: u32, generated_at: u64) -> Self {
        let period_secs = u64::from(period);
        let window_start = generated_at - generated_at % period_secs;
        Self {
            code: Secret::new(code),
            oath_type: OathType::Totp,
            digits,
            counter: None,
            period: Some(period),
            generated_at,
            valid_until: Some(window_start + period_secs),
        }
    }

    pub(crate) fn hotp(code: String, digits: u32, counter: u64, generated_at: u64) -> Self {
        Self {
            code: Secret::new(code),
            oath_type: OathType::Hotp,
            digits,
            counter: Some(counter),
            period: None,
            generated_at,
            valid_until: None,
        }
    }

    /// Expose the generated code (use with caution!)
    pub fn code(&self) -> &str {
        self.code.expose_secret()
    }

    /// Seconds left in the TOTP window at `now`; `None` for HOTP
    pub fn time_remaining(&self, now: u64) -> Option<u64> {
        self.valid_until.map(|until| until.saturating_sub(now))
    }

    /// Fraction of the TOTP window already elapsed at `now`, in `[0, 1]`
    pub fn progress(&self, now: u64) -> Option<f64> {
        let period = f64::from(self.period?);
        let remaining = self.time_remaining(now)? as f64;
        Some(((period - remaining) / period).clamp(0.0, 1.0))
    }
}
