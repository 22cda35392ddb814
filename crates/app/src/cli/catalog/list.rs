use mival_app::context::AppContext;
use tabled::{builder::Builder, settings::Style};

pub(crate) async fn run(ctx: &AppContext) -> Result<(), String> {
    let items = ctx
        .catalog
        .list_available()
        .await
        .map_err(|error| format!("failed to list catalog: {error}"))?;

    if items.is_empty() {
        println!("no purchasable items");
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["uuid", "title", "studio", "price", "status"]);

    for item in items {
        builder.push_record([
            item.id.to_string(),
            item.title,
            item.studio,
            item.price.to_string(),
            item.status.to_string(),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());

    println!("{table}");

    Ok(())
}
