//! Setup command implementation
//!
//! Writes a configuration file selecting the credential storage backend.

use oathkit_core::{
    config::{toml_config, OathConfig, StorageBackend},
    error::OathkitError,
};

/// Run the setup command
pub fn run_setup(backend: Option<StorageBackend>, force: bool) -> Result<(), OathkitError> {
    let config_path = toml_config::get_config_path()?;

    println!("🔐 oathkit setup");
    println!("================");
    println!();

    // Check if already configured
    if toml_config::config_exists()? && !force {
        println!("⚠️  Existing configuration detected at {}", config_path.display());
        println!("Re-run with --force to overwrite it.");
        return Ok(());
    }

    let mut config = OathConfig::default();
    if let Some(backend) = backend {
        config.storage.backend = backend;
    }

    println!("💾 Saving configuration...");
    toml_config::save_config(&config)?;

    println!("✅ Setup complete!");
    println!();
    println!("Configuration: {}", config_path.display());
    match config.storage.backend {
        StorageBackend::File => {
            let config_dir = toml_config::get_config_dir()?;
            println!(
                "Credentials:   {}",
                config.storage.file_path(&config_dir).display()
            );
        }
        StorageBackend::Keyring => {
            println!("Credentials:   system keyring (service '{}')", config.storage.service);
        }
        StorageBackend::Memory => {
            println!("Credentials:   memory only, nothing is kept between runs");
        }
    }
    println!();
    println!("You can now use:");
    println!("  oathkit add <URI>   - Register a credential");
    println!("  oathkit list        - List credentials");
    println!("  oathkit code <ID>   - Generate a one-time code");

    Ok(())
}
