use clap::{Args, Subcommand};
use mival::taxes::TaxRate;
use mival_app::context::AppContext;

#[derive(Debug, Args)]
pub(crate) struct TaxCommand {
    #[command(subcommand)]
    command: TaxSubcommand,
}

#[derive(Debug, Subcommand)]
enum TaxSubcommand {
    /// Show the VAT rate checkout will apply
    Show,

    /// Store the VAT rate, as a fraction in [0, 1)
    Set {
        rate: TaxRate,
    },
}

pub(crate) async fn run(ctx: &AppContext, command: TaxCommand) -> Result<(), String> {
    match command.command {
        TaxSubcommand::Show => show(ctx).await,
        TaxSubcommand::Set { rate } => set(ctx, rate).await,
    }
}

async fn show(ctx: &AppContext) -> Result<(), String> {
    let configured = ctx
        .taxes
        .configured_rate()
        .await
        .map_err(|error| format!("failed to read VAT rate: {error}"))?;

    match configured {
        Some(rate) => println!("vat_rate: {rate}"),
        None => println!("vat_rate: {} (fallback)", ctx.taxes.fallback_rate()),
    }

    Ok(())
}

async fn set(ctx: &AppContext, rate: TaxRate) -> Result<(), String> {
    ctx.taxes
        .set_rate(rate)
        .await
        .map_err(|error| format!("failed to store VAT rate: {error}"))?;

    println!("vat_rate: {rate}");

    Ok(())
}
