use clap::{Args, Subcommand};
use mival_app::context::AppContext;

mod list;

#[derive(Debug, Args)]
pub(crate) struct LibraryCommand {
    #[command(subcommand)]
    command: LibrarySubcommand,
}

#[derive(Debug, Subcommand)]
enum LibrarySubcommand {
    /// List the games a user owns
    List(list::ListGamesArgs),
}

pub(crate) async fn run(ctx: &AppContext, command: LibraryCommand) -> Result<(), String> {
    match command.command {
        LibrarySubcommand::List(args) => list::run(ctx, args).await,
    }
}
