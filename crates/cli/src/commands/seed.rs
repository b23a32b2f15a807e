//! Seed the catalog from a YAML file.
//!
//! The whole file is validated before anything is written. Products with an
//! `id` are created or replaced under that id (keeping their original
//! `createdAt`), so re-running a seed file is safe. Products without one get
//! a generated id.
//!
//! ```yaml
//! products:
//!   - id: jollof-tray
//!     name: Party Jollof
//!     type: catering
//!     fullPrice: "120.00"
//!     halfPrice: "70.00"
//!   - name: Adire Kaftan
//!     type: fashion
//!     price: "85.00"
//!     sizes: [S, M, L]
//! ```

use std::path::Path;
use std::sync::Arc;

use ajeborush_core::{ProductDraft, ProductId};
use ajeborush_storefront::services::Catalog;
use serde::Deserialize;
use tracing::{error, info};

use super::{CliError, connect};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub draft: ProductDraft,
}

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns `CliError::Yaml` for malformed YAML.
pub fn parse(content: &str) -> Result<SeedFile, CliError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Validation messages for every invalid entry, prefixed with its position
/// and name.
#[must_use]
pub fn validate(file: &SeedFile) -> Vec<String> {
    let mut problems = Vec::new();
    for (index, product) in file.products.iter().enumerate() {
        if let Err(errors) = product.draft.validate() {
            for (field, message) in errors.iter() {
                problems.push(format!(
                    "#{} {}: {field}: {message}",
                    index + 1,
                    product.draft.name
                ));
            }
        }
    }
    problems
}

/// Load products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, any entry is
/// invalid, or a write fails.
pub async fn products(file_path: &str, dry_run: bool) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let file = parse(&content)?;
    info!(products = file.products.len(), "Parsed seed file");

    let problems = validate(&file);
    if !problems.is_empty() {
        error!("Seed file validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(CliError::Invalid(problems.len()));
    }

    if dry_run {
        info!("Dry run: seed file is valid, nothing written");
        return Ok(());
    }

    let catalog = Catalog::new(Arc::new(connect().await?));
    for entry in file.products {
        let id = entry.id.map_or_else(ProductId::generate, ProductId::new);
        let product = catalog.put(id, entry.draft).await?;
        info!(id = %product.id, name = %product.name, "Seeded product");
    }

    info!("Seeding complete!");
    Ok(())
}
