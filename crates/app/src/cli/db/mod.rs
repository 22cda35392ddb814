use clap::{Args, Subcommand};
use mival_app::config::DatabaseConfig;

mod migrate;

#[derive(Debug, Args)]
pub(crate) struct DbCommand {
    #[command(subcommand)]
    command: DbSubcommand,
}

#[derive(Debug, Subcommand)]
enum DbSubcommand {
    /// Apply pending schema migrations
    Migrate,
}

pub(crate) async fn run(database: &DatabaseConfig, command: DbCommand) -> Result<(), String> {
    match command.command {
        DbSubcommand::Migrate => migrate::run(database).await,
    }
}
