//! Core library for the oathkit OATH credential tool
//!
//! This crate provides OATH (TOTP/HOTP) credential registration from
//! `otpauth://` and `mfauth://` URIs, policy-gated credential lifecycle,
//! pluggable credential storage and one-time code generation.

pub mod error;
pub mod types;

pub mod config;
pub mod oath;
pub mod policy;
pub mod storage;

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "OATHKIT_LOG";

fn level_from_env(default: tracing::Level) -> tracing::Level {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Initialize logging infrastructure
///
/// Sets up tracing with systemd journal logging when running under systemd.
/// Otherwise logs to stderr with pretty formatting. The level comes from
/// `OATHKIT_LOG` and falls back to `default_level`.
pub fn init_logging(default_level: tracing::Level) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = LevelFilter::from_level(level_from_env(default_level));

    // Try to use systemd journal logging if available
    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            // We're running under systemd, use journal logging
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(level)
                .try_init()?;
            return Ok(());
        }
    }

    // Fallback to stderr logging with pretty formatting
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr),
        )
        .with(level)
        .try_init()?;

    Ok(())
}
