//! Test Helpers

use jiff::{Timestamp, ToSpan, civil::date, tz::TimeZone};
use mival::{
    carts::{Cart, CartUuid},
    catalog::{CatalogItem, CatalogItemStatus, CatalogItemUuid},
    discounts::DiscountKind,
    payments::{IdempotencyKey, PaymentInstrument, PaymentInstrumentUuid},
    users::{User, UserUuid},
};
use rust_decimal::Decimal;
use sqlx::query_scalar;

use crate::{
    domain::{
        carts::{CartsService, CartsServiceError, data::NewCart},
        catalog::{CatalogService, CatalogServiceError, data::NewCatalogItem},
        discounts::data::NewDiscountCode,
        payments::{
            PaymentInstrumentsService, PaymentInstrumentsServiceError,
            data::{NewInstrumentTerms, NewPaymentInstrument},
        },
        users::{UsersService, UsersServiceError, data::NewUser},
    },
    test::TestContext,
};

pub(crate) async fn create_user(ctx: &TestContext) -> Result<User, UsersServiceError> {
    let uuid = UserUuid::new();

    ctx.users
        .create_user(NewUser {
            uuid,
            display_name: "Test Player".to_string(),
            email: format!("{uuid}@example.test"),
        })
        .await
}

pub(crate) fn new_catalog_item(title: &str, price: Decimal) -> NewCatalogItem {
    NewCatalogItem {
        uuid: CatalogItemUuid::new(),
        title: title.to_string(),
        studio: "Test Studio".to_string(),
        genre_id: 1,
        platform_id: 1,
        description: String::new(),
        price,
        status: CatalogItemStatus::Available,
    }
}

pub(crate) async fn create_catalog_item(
    ctx: &TestContext,
    title: &str,
    price: Decimal,
) -> Result<CatalogItem, CatalogServiceError> {
    ctx.catalog
        .create_item(new_catalog_item(title, price))
        .await
}

pub(crate) async fn create_cart(
    ctx: &TestContext,
    user: UserUuid,
) -> Result<Cart, CartsServiceError> {
    ctx.carts
        .create_cart(NewCart {
            uuid: CartUuid::new(),
            user_uuid: user,
        })
        .await
}

pub(crate) async fn create_credit_card(
    ctx: &TestContext,
    user: UserUuid,
    credit_limit: Decimal,
) -> Result<PaymentInstrument, PaymentInstrumentsServiceError> {
    ctx.instruments
        .create_instrument(NewPaymentInstrument {
            uuid: PaymentInstrumentUuid::new(),
            user_uuid: user,
            holder_name: "Test Player".to_string(),
            card_number: "4111111111111111".to_string(),
            expires_on: date(2035, 12, 31),
            terms: NewInstrumentTerms::Credit { credit_limit },
        })
        .await
}

pub(crate) async fn create_debit_card(
    ctx: &TestContext,
    user: UserUuid,
) -> Result<PaymentInstrument, PaymentInstrumentsServiceError> {
    ctx.instruments
        .create_instrument(NewPaymentInstrument {
            uuid: PaymentInstrumentUuid::new(),
            user_uuid: user,
            holder_name: "Test Player".to_string(),
            card_number: "5555555555554444".to_string(),
            expires_on: date(2035, 12, 31),
            terms: NewInstrumentTerms::Debit {
                account_reference: "ES91 2100 0418 4502 0005 1332".to_string(),
            },
        })
        .await
}

/// An active single-use code valid from a week ago until a month from now.
pub(crate) fn new_discount_code(
    code: &str,
    kind: DiscountKind,
    value: Decimal,
) -> Result<NewDiscountCode, jiff::Error> {
    let today = Timestamp::now().to_zoned(TimeZone::UTC).date();

    Ok(NewDiscountCode {
        code: code.to_string(),
        value,
        kind,
        starts_on: today.checked_sub(7.days())?,
        ends_on: today.checked_add(30.days())?,
        is_active: true,
        is_accumulable: false,
    })
}

pub(crate) async fn count_payment_transactions(
    ctx: &TestContext,
    key: &IdempotencyKey,
) -> Result<i64, sqlx::Error> {
    query_scalar("SELECT COUNT(*) FROM payment_transactions WHERE idempotency_key = $1")
        .bind(key.as_str())
        .fetch_one(ctx.pool())
        .await
}

/// Amount captured under `key`, if anything was.
pub(crate) async fn charged_amount(
    ctx: &TestContext,
    key: &IdempotencyKey,
) -> Result<Option<Decimal>, sqlx::Error> {
    query_scalar("SELECT amount FROM payment_transactions WHERE idempotency_key = $1")
        .bind(key.as_str())
        .fetch_optional(ctx.pool())
        .await
}

pub(crate) async fn count_orders(ctx: &TestContext, user: UserUuid) -> Result<i64, sqlx::Error> {
    query_scalar("SELECT COUNT(*) FROM orders WHERE user_uuid = $1")
        .bind(user.into_uuid())
        .fetch_one(ctx.pool())
        .await
}

pub(crate) async fn count_history(ctx: &TestContext, user: UserUuid) -> Result<i64, sqlx::Error> {
    query_scalar("SELECT COUNT(*) FROM purchase_history WHERE user_uuid = $1")
        .bind(user.into_uuid())
        .fetch_one(ctx.pool())
        .await
}

pub(crate) async fn count_library_entries(
    ctx: &TestContext,
    user: UserUuid,
) -> Result<i64, sqlx::Error> {
    query_scalar("SELECT COUNT(*) FROM library_entries WHERE user_uuid = $1")
        .bind(user.into_uuid())
        .fetch_one(ctx.pool())
        .await
}
