//! CLI subcommands.

pub mod migrate;
pub mod orders;
pub mod seed;

use ajeborush_storefront::services::{FulfillmentError, ServiceError};
use ajeborush_storefront::store::{PostgresStore, StoreError};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Seed file failed validation.
    #[error("{0} validation error(s) found")]
    Invalid(usize),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),
}

/// Read the document store URL from the environment.
fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Connect to the `PostgreSQL` document store.
async fn connect() -> Result<PostgresStore, CliError> {
    let url = database_url()?;
    tracing::info!("Connecting to document store...");
    Ok(PostgresStore::connect(&url).await?)
}
