use clap::Args;
use mival::{
    carts::CartUuid,
    payments::{IdempotencyKey, PaymentInstrumentUuid},
};
use mival_app::{context::AppContext, domain::checkout::FinalizeOrder};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Cart to finalize
    #[arg(long)]
    cart: Uuid,

    /// Payment instrument to charge
    #[arg(long)]
    instrument: Uuid,

    /// Optional discount code
    #[arg(long)]
    code: Option<String>,

    /// Idempotency key; generated when omitted. Reuse it to retry safely.
    #[arg(long)]
    idempotency_key: Option<IdempotencyKey>,
}

pub(crate) async fn run(ctx: &AppContext, args: CheckoutArgs) -> Result<(), String> {
    let idempotency_key = args.idempotency_key.unwrap_or_else(IdempotencyKey::generate);

    let result = ctx
        .checkout
        .finalize(FinalizeOrder {
            cart: CartUuid::from_uuid(args.cart),
            payment_instrument: PaymentInstrumentUuid::from_uuid(args.instrument),
            discount_code: args.code,
            idempotency_key: idempotency_key.clone(),
        })
        .await;

    match result {
        Ok(order) => {
            let json = serde_json::to_string_pretty(&order)
                .map_err(|error| format!("failed to render order: {error}"))?;

            println!("{json}");

            Ok(())
        }
        Err(error) => {
            let report = json!({
                "stage": error.stage,
                "category": error.category(),
                "retryable": error.is_retryable(),
                "idempotency_key": idempotency_key.as_str(),
                "message": error.to_string(),
            });

            Err(report.to_string())
        }
    }
}
