//! oathkit - OATH credential manager
//!
//! A command-line tool for registering TOTP/HOTP credentials from
//! `otpauth://` and `mfauth://` URIs and generating one-time codes,
//! with policy-gated access to each credential.

use clap::{Parser, Subcommand};
use oathkit_core::{config::StorageBackend, error::OathkitError, init_logging};

mod cli;

#[derive(Parser)]
#[command(name = "oathkit")]
#[command(about = "OATH (TOTP/HOTP) credential manager with policy-gated access")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file
    Setup {
        /// Storage backend (file, keyring or memory)
        #[arg(long)]
        backend: Option<StorageBackend>,
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Register a credential from an otpauth:// or mfauth:// URI
    Add {
        uri: String,
    },
    /// List registered credentials
    List {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one credential's details
    Show {
        id: String,
    },
    /// Generate a one-time code
    Code {
        id: String,
        /// Also print the validity window or consumed counter
        #[arg(long)]
        validity: bool,
    },
    /// Print a credential's registration URI
    Export {
        id: String,
    },
    /// Remove a credential
    Delete {
        id: String,
    },
}

fn exit_code(err: &OathkitError) -> i32 {
    match err {
        // Configuration errors (exit code 2)
        OathkitError::Config(_) | OathkitError::Toml(_) | OathkitError::TomlSerialize(_) => 2,
        // Bad URIs and rejected registrations are input errors
        OathkitError::Oath(oath_error) if oath_error.is_input_error() => 2,
        // Lookup, lock, storage and generation failures (exit code 1 - runtime)
        OathkitError::Oath(_) => 1,
        OathkitError::Io(_) => 1,
    }
}

fn main() {
    // Initialize logging
    if let Err(e) = init_logging(tracing::Level::WARN) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Setup { backend, force } => cli::setup::run_setup(backend, force),
        Commands::Add { uri } => cli::credentials::run_add(&uri),
        Commands::List { json } => cli::credentials::run_list(json),
        Commands::Show { id } => cli::credentials::run_show(&id),
        Commands::Code { id, validity } => cli::code::run_code(&id, validity),
        Commands::Export { id } => cli::credentials::run_export(&id),
        Commands::Delete { id } => cli::credentials::run_delete(&id),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(exit_code(&e));
        }
    }
}
