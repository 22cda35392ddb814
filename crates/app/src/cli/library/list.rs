use clap::Args;
use mival::users::UserUuid;
use mival_app::context::AppContext;
use tabled::{builder::Builder, settings::Style};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct ListGamesArgs {
    /// User whose library should be listed
    #[arg(long)]
    user: Uuid,
}

pub(crate) async fn run(ctx: &AppContext, args: ListGamesArgs) -> Result<(), String> {
    let games = ctx
        .library
        .list_games(UserUuid::from_uuid(args.user))
        .await
        .map_err(|error| format!("failed to list library: {error}"))?;

    if games.is_empty() {
        println!("no games owned by user {}", args.user);
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["title", "purchased_at", "activation_key"]);

    for game in games {
        builder.push_record([
            game.item.title,
            game.purchased_at.to_string(),
            game.activation_key.unwrap_or_else(|| "-".to_string()),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());

    println!("{table}");

    Ok(())
}
