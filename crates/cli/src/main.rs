//! AjeboRush CLI - migrations, catalog seeding and fulfilment tools.
//!
//! # Usage
//!
//! ```bash
//! # Create or update the document table
//! ajebo-cli migrate
//!
//! # Load catalog products from YAML
//! ajebo-cli seed products catalog.yaml
//!
//! # Check a catalog file without writing anything
//! ajebo-cli seed products catalog.yaml --dry-run
//!
//! # Mark an order completed
//! ajebo-cli orders complete 3f2a9c1e-...
//! ```
//!
//! All commands talk to the `PostgreSQL` document store named by
//! `STOREFRONT_DATABASE_URL` (falls back to `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "ajebo-cli")]
#[command(author, version, about = "AjeboRush CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run document store migrations
    Migrate,
    /// Seed the store from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Order fulfilment
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load catalog products from a YAML file
    Products {
        /// Path to the YAML file
        file: String,

        /// Validate only, write nothing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Mark an order completed
    Complete {
        /// Order id
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, dry_run } => {
                commands::seed::products(&file, dry_run).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrderAction::Complete { id } => commands::orders::complete(&id).await?,
        },
    }
    Ok(())
}
