use clap::{Parser, Subcommand};
use mival_app::{
    config::{CheckoutConfig, DatabaseConfig, LoggingConfig},
    context::AppContext,
};

mod catalog;
mod checkout;
mod db;
mod library;
mod tax;

#[derive(Debug, Parser)]
#[command(name = "mival", about = "Mival storefront CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(flatten)]
    checkout: CheckoutConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Catalog(catalog::CatalogCommand),
    Checkout(checkout::CheckoutArgs),
    Library(library::LibraryCommand),
    Tax(tax::TaxCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        if let Commands::Db(command) = self.command {
            return db::run(&self.database, command).await;
        }

        let ctx = AppContext::from_config(&self.database, &self.checkout)
            .await
            .map_err(|error| format!("failed to initialise: {error}"))?;

        match self.command {
            Commands::Db(_) => Ok(()),
            Commands::Catalog(command) => catalog::run(&ctx, command).await,
            Commands::Checkout(args) => checkout::run(&ctx, args).await,
            Commands::Library(command) => library::run(&ctx, command).await,
            Commands::Tax(command) => tax::run(&ctx, command).await,
        }
    }
}
