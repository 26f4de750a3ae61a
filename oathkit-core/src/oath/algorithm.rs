//! One-time code generation
//!
//! Implements RFC 4226 HOTP and RFC 6238 TOTP using the totp-lite crate.
//! HOTP is computed as a TOTP with a one-second step evaluated at the
//! counter value, which yields exactly HMAC(secret, counter) followed by
//! dynamic truncation.

use crate::error::OathError;
use crate::oath::encoding::decode_secret;
use crate::types::{OathAlgorithm, OathCodeInfo, OathCredential, OathType, MAX_DIGITS, MIN_DIGITS};
use std::time::{SystemTime, UNIX_EPOCH};
use totp_lite::{Sha1, Sha256, Sha512};

/// Compute the code for an explicit moving factor
///
/// `moving_factor` is the HOTP counter or the TOTP time step number.
pub fn compute_code(
    key: &[u8],
    algorithm: OathAlgorithm,
    digits: u32,
    moving_factor: u64,
) -> Result<String, OathError> {
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        return Err(OathError::CodeGenerationFailed {
            reason: format!("unsupported code length {}", digits),
        });
    }
    if key.is_empty() {
        return Err(OathError::CodeGenerationFailed {
            reason: "empty key".to_string(),
        });
    }

    let code = match algorithm {
        OathAlgorithm::Sha1 => totp_lite::totp_custom::<Sha1>(1, digits, key, moving_factor),
        OathAlgorithm::Sha256 => totp_lite::totp_custom::<Sha256>(1, digits, key, moving_factor),
        OathAlgorithm::Sha512 => totp_lite::totp_custom::<Sha512>(1, digits, key, moving_factor),
    };

    Ok(code)
}

/// Generate the code a credential shows at `unix_time`
///
/// For HOTP the credential's current counter is used and the caller is
/// responsible for advancing it afterwards.
pub fn generate_code_at(
    credential: &OathCredential,
    unix_time: u64,
) -> Result<OathCodeInfo, OathError> {
    let key = decode_secret(credential.secret().expose()).ok_or_else(|| {
        OathError::CodeGenerationFailed {
            reason: "secret is neither Base32 nor base64".to_string(),
        }
    })?;

    match credential.oath_type {
        OathType::Totp => {
            if credential.period == 0 {
                return Err(OathError::CodeGenerationFailed {
                    reason: "period must be positive".to_string(),
                });
            }
            let step = unix_time / u64::from(credential.period);
            let code = compute_code(&key, credential.oath_algorithm, credential.digits, step)?;
            Ok(OathCodeInfo::totp(
                code,
                credential.digits,
                credential.period,
                unix_time,
            ))
        }
        OathType::Hotp => {
            let code = compute_code(
                &key,
                credential.oath_algorithm,
                credential.digits,
                credential.counter,
            )?;
            Ok(OathCodeInfo::hotp(
                code,
                credential.digits,
                credential.counter,
                unix_time,
            ))
        }
    }
}

/// Current Unix time in seconds
pub fn unix_now() -> Result<u64, OathError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| OathError::CodeGenerationFailed {
            reason: "system clock is before the Unix epoch".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_KEY_SHA1: &[u8] = b"12345678901234567890";
    const RFC_KEY_SHA256: &[u8] = b"12345678901234567890123456789012";
    const RFC_KEY_SHA512: &[u8] =
        b"1234567890123456789012345678901234567890123456789012345678901234";

    #[test]
    fn test_rfc4226_hotp_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, code) in expected.iter().enumerate() {
            let generated = compute_code(RFC_KEY_SHA1, OathAlgorithm::Sha1, 6, counter as u64)
                .expect("HOTP generation");
            assert_eq!(&generated, code, "counter {}", counter);
        }
    }

    #[test]
    fn test_rfc6238_totp_vectors() {
        let cases = [
            (59u64, "94287082", "46119246", "90693936"),
            (1111111109, "07081804", "68084774", "25091201"),
            (1111111111, "14050471", "67062674", "99943326"),
            (1234567890, "89005924", "91819424", "93441116"),
            (2000000000, "69279037", "90698825", "38618901"),
        ];
        for (time, sha1, sha256, sha512) in cases {
            let step = time / 30;
            assert_eq!(compute_code(RFC_KEY_SHA1, OathAlgorithm::Sha1, 8, step).unwrap(), sha1);
            assert_eq!(
                compute_code(RFC_KEY_SHA256, OathAlgorithm::Sha256, 8, step).unwrap(),
                sha256
            );
            assert_eq!(
                compute_code(RFC_KEY_SHA512, OathAlgorithm::Sha512, 8, step).unwrap(),
                sha512
            );
        }
    }

    #[test]
    fn test_code_length_matches_digits() {
        for digits in MIN_DIGITS..=MAX_DIGITS {
            for factor in 0..50u64 {
                let code = compute_code(RFC_KEY_SHA1, OathAlgorithm::Sha1, digits, factor).unwrap();
                assert_eq!(code.len(), digits as usize);
                assert!(code.chars().all(|c| c.is_ascii_digit()));
            }
        }
    }

    #[test]
    fn test_rejects_unsupported_digits() {
        assert!(compute_code(RFC_KEY_SHA1, OathAlgorithm::Sha1, 3, 0).is_err());
        assert!(compute_code(RFC_KEY_SHA1, OathAlgorithm::Sha1, 9, 0).is_err());
    }

    #[test]
    fn test_generate_totp_from_credential() {
        let mut credential = OathCredential::new(
            "Example",
            "alice",
            OathType::Totp,
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
        );
        credential.digits = 8;

        let info = generate_code_at(&credential, 59).unwrap();
        assert_eq!(info.code(), "94287082");
        assert_eq!(info.valid_until, Some(60));
        assert_eq!(info.time_remaining(59), Some(1));
        assert_eq!(info.counter, None);
    }

    #[test]
    fn test_generate_hotp_uses_counter() {
        let mut credential = OathCredential::new(
            "Example",
            "alice",
            OathType::Hotp,
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
        );
        credential.counter = 1;

        let info = generate_code_at(&credential, 0).unwrap();
        assert_eq!(info.code(), "287082");
        assert_eq!(info.counter, Some(1));
        assert_eq!(info.valid_until, None);
    }

    #[test]
    fn test_base64_secret_generates_rfc_codes() {
        let mut credential = OathCredential::new(
            "Example",
            "alice",
            OathType::Hotp,
            "MTIzNDU2Nzg5MDEyMzQ1Njc4OTA=",
        );
        credential.counter = 1;
        assert_eq!(generate_code_at(&credential, 0).unwrap().code(), "287082");

        let mut totp = OathCredential::new(
            "Example",
            "alice",
            OathType::Totp,
            "MTIzNDU2Nzg5MDEyMzQ1Njc4OTA=",
        );
        totp.digits = 8;
        assert_eq!(generate_code_at(&totp, 59).unwrap().code(), "94287082");
    }

    #[test]
    fn test_malformed_secret_fails_generation() {
        let credential = OathCredential::new("Example", "alice", OathType::Totp, "not base32!");
        assert!(matches!(
            generate_code_at(&credential, 59),
            Err(OathError::CodeGenerationFailed { .. })
        ));
    }
}
