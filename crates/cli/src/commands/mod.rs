//! `bv-cli` subcommands.

pub mod migrate;
pub mod pending;
pub mod roles;

use bookvision_core::EmailError;
use bookvision_portal::config::ConfigError;
use bookvision_portal::services::EntitlementError;
use bookvision_portal::state::StateError;
use bookvision_portal::storage::StorageError;
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Portal configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// API clients could not be built.
    #[error("Initialization error: {0}")]
    State(#[from] StateError),

    /// Blob store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Role reconciliation failed.
    #[error("Entitlement error: {0}")]
    Entitlement(#[from] EntitlementError),
}

/// The portal database URL, `PORTAL_DATABASE_URL` first, then `DATABASE_URL`.
fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("PORTAL_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("PORTAL_DATABASE_URL"))
}
