//! Command implementations.
//!
//! Every command prints a single pretty JSON document on stdout. Logs go to
//! stderr.

pub mod access;
pub mod session;
pub mod urls;

use std::path::Path;
use std::sync::Arc;

use account_sdk::cache::StorageError;
use account_sdk::{
    ConfigError, FileStorage, Identity, Monetization, Platform, SdkConfig, SdkError,
    TransportError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache file error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Clients shared by all commands.
pub struct Context {
    pub identity: Identity,
    pub monetization: Monetization,
}

impl Context {
    /// Load configuration and open the cache file.
    pub fn load(cache_file: &Path) -> Result<Self, CliError> {
        let config = SdkConfig::from_env()?;
        let transports = config.transports()?;
        let storage = FileStorage::open(cache_file)?;
        tracing::debug!(
            env = %config.env,
            cache = %storage.path().display(),
            "Configuration loaded"
        );

        let platform = Platform::headless(config.document_domain.clone())
            .with_storage(Some(Arc::new(storage)));

        Ok(Self {
            monetization: Monetization::new(&config, &transports, &platform),
            identity: Identity::new(&config, &transports, platform),
        })
    }
}

/// Print `value` as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
