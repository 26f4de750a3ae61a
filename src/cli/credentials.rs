//! Credential management commands
//!
//! Implements `add`, `list`, `show`, `export` and `delete`. Secrets are
//! only ever printed by `export`, which exists to hand a credential on.

use super::with_client;
use colored::Colorize;
use oathkit_core::error::{OathError, OathkitError};
use oathkit_core::oath::format_uri;
use oathkit_core::types::{OathCredential, OathType};

/// Lock status for human-readable output
fn lock_status(credential: &OathCredential) -> String {
    match (&credential.is_locked, &credential.locking_policy) {
        (true, Some(policy)) => format!("locked ({})", policy).red().to_string(),
        (true, None) => "locked".red().to_string(),
        (false, _) => "ok".green().to_string(),
    }
}

fn not_found(id: &str) -> OathError {
    OathError::CredentialNotFound {
        credential_id: id.to_string(),
    }
}

/// Run the add command
pub fn run_add(uri: &str) -> Result<(), OathkitError> {
    let credential = with_client(|client| {
        let uri = uri.to_string();
        async move { client.add_credential_from_uri(&uri).await }
    })?;

    println!("✅ Added {}", credential.id.bold());
    if credential.is_locked {
        println!("⚠️  Credential is {}", lock_status(&credential));
    }
    Ok(())
}

/// Run the list command
///
/// With `json` the output is a machine-parsable array without secrets.
pub fn run_list(json: bool) -> Result<(), OathkitError> {
    let mut credentials = with_client(|client| async move { client.get_credentials().await })?;
    credentials.sort_by(|a, b| a.id.cmp(&b.id));

    if json {
        let summaries: Vec<serde_json::Value> = credentials
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "issuer": c.display_issuer,
                    "accountName": c.display_account_name,
                    "oathType": c.oath_type,
                    "isLocked": c.is_locked,
                    "lockingPolicy": c.locking_policy,
                })
            })
            .collect();
        let output = serde_json::to_string_pretty(&summaries).map_err(std::io::Error::from)?;
        println!("{}", output);
        return Ok(());
    }

    if credentials.is_empty() {
        println!("No credentials registered.");
        return Ok(());
    }

    for credential in &credentials {
        println!(
            "{:<40} {:<5} {}",
            credential.id,
            credential.oath_type,
            lock_status(credential)
        );
    }
    Ok(())
}

/// Run the show command
pub fn run_show(id: &str) -> Result<(), OathkitError> {
    let credential = with_client(|client| {
        let id = id.to_string();
        async move { client.get_credential(&id).await?.ok_or_else(|| not_found(&id)) }
    })?;

    println!("{}", credential.id.bold());
    println!("  Issuer:    {}", credential.display_issuer);
    println!("  Account:   {}", credential.display_account_name);
    println!("  Type:      {}", credential.oath_type);
    println!("  Algorithm: {}", credential.oath_algorithm.as_uri_value());
    println!("  Digits:    {}", credential.digits);
    match credential.oath_type {
        OathType::Totp => println!("  Period:    {}s", credential.period),
        OathType::Hotp => println!("  Counter:   {}", credential.counter),
    }
    if let Some(user_id) = &credential.user_id {
        println!("  User:      {}", user_id);
    }
    if let Some(resource_id) = &credential.resource_id {
        println!("  Resource:  {}", resource_id);
    }
    if let Some(policies) = &credential.policies {
        println!("  Policies:  {}", policies);
    }
    println!("  Status:    {}", lock_status(&credential));
    Ok(())
}

/// Run the export command
///
/// Prints the registration URI, secret included, to stdout only.
pub fn run_export(id: &str) -> Result<(), OathkitError> {
    let uri = with_client(|client| {
        let id = id.to_string();
        async move {
            let credential = client.get_credential(&id).await?.ok_or_else(|| not_found(&id))?;
            Ok(format_uri(&credential))
        }
    })?;

    println!("{}", uri);
    Ok(())
}

/// Run the delete command
pub fn run_delete(id: &str) -> Result<(), OathkitError> {
    let removed = with_client(|client| {
        let id = id.to_string();
        async move { client.delete_credential(&id).await }
    })?;

    if !removed {
        return Err(not_found(id).into());
    }
    println!("🗑️  Deleted {}", id);
    Ok(())
}
