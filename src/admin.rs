//! Administrative command handlers.
//!
//! CLI commands that operate directly on the PostgreSQL store: running
//! migrations, printing totals and deactivating a link by its secret key.

use crate::config::{Config, StoreBackend};
use crate::db::{PgStore, UrlStore};
use crate::error::{AppError, AppResult};
use clap::Subcommand;
use tracing::info;

/// Administrative commands available via CLI.
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Run database migrations
    Migrate,

    /// Show record and click totals
    Stats,

    /// Deactivate a short URL by its admin secret
    Deactivate {
        /// The secret key shown in the link's admin URL
        secret_key: String,
    },
}

/// Run an administrative command with the given configuration.
pub async fn run(config: Config, admin_command: AdminCommands) -> AppResult<()> {
    if config.database.backend != StoreBackend::Postgres {
        return Err(AppError::Configuration(
            "Admin commands require STORE_BACKEND=postgres".to_string(),
        ));
    }

    let store = PgStore::connect(&config.database).await?;

    match admin_command {
        AdminCommands::Migrate => {
            info!("Running database migrations...");
            store.run_migrations().await?;
            info!("Migrations completed successfully");
        }
        AdminCommands::Stats => {
            let stats = store.stats().await?;
            println!("Total URLs:   {}", stats.total_urls);
            println!("Active URLs:  {}", stats.active_urls);
            println!("Total clicks: {}", stats.total_clicks);
        }
        AdminCommands::Deactivate { secret_key } => match store.deactivate(&secret_key).await? {
            Some(record) => {
                println!("Deactivated {} -> {}", record.key, record.target_url);
            }
            None => {
                return Err(AppError::UrlNotFound(format!(
                    "{}/admin/{}",
                    config.url.base_url, secret_key
                )));
            }
        },
    }

    Ok(())
}
