//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.
//! Every command runs against a fresh [`OathClient`] built from the
//! on-disk configuration.

pub mod code;
pub mod credentials;
pub mod setup;

use oathkit_core::config::toml_config::{get_config_dir, load_config_or_default};
use oathkit_core::error::{OathError, OathkitError};
use oathkit_core::oath::OathClient;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Run `command` against a client built from the current configuration
///
/// The client is closed whether or not the command succeeds.
pub fn with_client<T, F, Fut>(command: F) -> Result<T, OathkitError>
where
    F: FnOnce(Arc<OathClient>) -> Fut,
    Fut: Future<Output = Result<T, OathError>>,
{
    let config = load_config_or_default()?;
    let config_dir = get_config_dir()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = Arc::new(OathClient::from_config(&config, &config_dir));
        debug!(config_dir = %config_dir.display(), "Client ready");
        let result = command(client.clone()).await;
        client.close().await;
        result.map_err(OathkitError::from)
    })
}
