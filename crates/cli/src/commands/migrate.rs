//! Document store migration command.
//!
//! # Usage
//!
//! ```bash
//! ajebo-cli migrate
//! ```
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in
//! the storefront crate. The storefront binary also applies them at startup
//! when `STOREFRONT_STORE=postgres`.

use super::{CliError, connect};

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or
/// a migration fails.
pub async fn run() -> Result<(), CliError> {
    let store = connect().await?;

    tracing::info!("Running document store migrations...");
    store.migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
