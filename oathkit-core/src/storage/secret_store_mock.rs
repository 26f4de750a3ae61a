//! Mock secret store implementation for testing
//!
//! Provides an in-memory keyring implementation that doesn't require
//! system keyring access. Used in CI environments and for testing.

use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref MOCK_KEYRING: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());
}

/// Generate a key for the mock keyring
fn make_key(service: &str, account: &str) -> String {
    format!("{}:{}", service, account)
}

/// Store a value in the mock keyring
pub fn set_secret(service: &str, account: &str, value: &str) -> Result<(), StorageError> {
    let mut keyring = MOCK_KEYRING.lock().map_err(|_| StorageError::StoreFailed {
        reason: "mock keyring poisoned".to_string(),
    })?;
    keyring.insert(make_key(service, account), value.to_string());
    Ok(())
}

/// Retrieve a value from the mock keyring
pub fn get_secret(service: &str, account: &str) -> Result<Option<String>, StorageError> {
    let keyring = MOCK_KEYRING.lock().map_err(|_| StorageError::RetrieveFailed {
        reason: "mock keyring poisoned".to_string(),
    })?;
    Ok(keyring.get(&make_key(service, account)).cloned())
}

/// Delete a value from the mock keyring
pub fn delete_secret(service: &str, account: &str) -> Result<bool, StorageError> {
    let mut keyring = MOCK_KEYRING.lock().map_err(|_| StorageError::RemoveFailed {
        reason: "mock keyring poisoned".to_string(),
    })?;
    Ok(keyring.remove(&make_key(service, account)).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_store_and_retrieve() {
        let service = "oathkit-test-mock";
        let account = "store_and_retrieve";

        // Clean up first
        let _ = delete_secret(service, account);

        set_secret(service, account, "value").expect("Failed to store value");
        assert_eq!(
            get_secret(service, account).expect("Failed to retrieve value"),
            Some("value".to_string())
        );

        assert!(delete_secret(service, account).expect("Failed to delete value"));
        assert!(!delete_secret(service, account).expect("Failed to delete value twice"));
        assert_eq!(get_secret(service, account).unwrap(), None);
    }
}
