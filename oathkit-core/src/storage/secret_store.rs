//! System keyring access
//!
//! Uses the platform keyring (Secret Service on Linux, Keychain on macOS,
//! Credential Manager on Windows) to hold serialized credentials.

use crate::error::StorageError;
use keyring::Entry;

fn entry(service: &str, account: &str) -> Result<Entry, StorageError> {
    Entry::new(service, account).map_err(|e| StorageError::ServiceUnavailable {
        reason: e.to_string(),
    })
}

/// Store a value in the system keyring
pub fn set_secret(service: &str, account: &str, value: &str) -> Result<(), StorageError> {
    entry(service, account)?
        .set_password(value)
        .map_err(|e| StorageError::StoreFailed {
            reason: e.to_string(),
        })
}

/// Retrieve a value from the system keyring
pub fn get_secret(service: &str, account: &str) -> Result<Option<String>, StorageError> {
    match entry(service, account)?.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(StorageError::RetrieveFailed {
            reason: e.to_string(),
        }),
    }
}

/// Delete a value from the system keyring
pub fn delete_secret(service: &str, account: &str) -> Result<bool, StorageError> {
    match entry(service, account)?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => Err(StorageError::RemoveFailed {
            reason: e.to_string(),
        }),
    }
}
