//! Order finalizer.
//!
//! Every write of a checkout lands in one transaction that holds a row lock
//! on the cart. The only side effect outside it is the payment capture, which
//! is keyed by the request's idempotency key so a retry after a rollback
//! replays the earlier capture instead of charging again.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::{Timestamp, Unit, tz::TimeZone};
use mival::{
    carts::CartState,
    discounts::{DiscountError, normalize_code},
    library::LibraryEntry,
    orders::{Order, OrderId, OrderLine, OrderParts, OrderStatus, PurchaseRecord},
    payments::PaymentInstrument,
};
use mockall::automock;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tokio::time::timeout;
use tracing::{Span, debug, info, warn};

use crate::{
    database::Db,
    domain::{
        carts::repositories::{PgCartItemsRepository, PgCartsRepository},
        checkout::{
            data::{CheckoutSettings, CheckoutStage, FinalizeOrder},
            errors::{CheckoutError, CheckoutFailure},
        },
        discounts::repository::PgDiscountsRepository,
        library::repository::PgLibraryRepository,
        orders::repositories::{NewOrderHeader, PgOrdersRepository, PgPurchaseHistoryRepository},
        payments::{
            PaymentError, PaymentProcessor, data::ChargeRequest,
            repositories::PgPaymentInstrumentsRepository,
        },
        taxes::PgTaxCalculator,
    },
};

/// Result of the transactional part of a checkout.
enum Finalized {
    Created(Order),
    Replayed(Order),
}

pub struct PgOrderFinalizer {
    db: Db,
    payments: Arc<dyn PaymentProcessor>,
    payment_timeout: Duration,
    taxes: PgTaxCalculator,
    carts: PgCartsRepository,
    cart_items: PgCartItemsRepository,
    discounts: PgDiscountsRepository,
    instruments: PgPaymentInstrumentsRepository,
    orders: PgOrdersRepository,
    history: PgPurchaseHistoryRepository,
    library: PgLibraryRepository,
}

impl PgOrderFinalizer {
    /// The checkout transaction holds a connection from `db` while `payments`
    /// captures, so the processor must not draw from the same pool.
    #[must_use]
    pub fn new(db: Db, payments: Arc<dyn PaymentProcessor>, settings: CheckoutSettings) -> Self {
        Self {
            db,
            payments,
            payment_timeout: settings.payment_timeout,
            taxes: PgTaxCalculator::new(settings.fallback_tax_rate),
            carts: PgCartsRepository::new(),
            cart_items: PgCartItemsRepository::new(),
            discounts: PgDiscountsRepository::new(),
            instruments: PgPaymentInstrumentsRepository::new(),
            orders: PgOrdersRepository::new(),
            history: PgPurchaseHistoryRepository::new(),
            library: PgLibraryRepository::new(),
        }
    }

    async fn run(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request: &FinalizeOrder,
        stage: &mut CheckoutStage,
    ) -> Result<Finalized, CheckoutFailure> {
        // Stored timestamps have microsecond precision.
        let now = Timestamp::now();
        let now = now.round(Unit::Microsecond).unwrap_or(now);
        let today = now.to_zoned(TimeZone::UTC).date();

        let header = self
            .carts
            .lock_cart(tx, request.cart)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => CheckoutFailure::CartNotFound(request.cart),
                other => CheckoutFailure::Persistence(other),
            })?;

        // Checked after the cart lock so a concurrent retry of the same key
        // sees the committed order.
        if let Some(existing) = self
            .orders
            .find_by_idempotency_key(tx, &request.idempotency_key)
            .await?
        {
            if existing.cart_uuid != request.cart {
                return Err(CheckoutFailure::IdempotencyKeyReused(existing.cart_uuid));
            }

            let order = self.orders.get_order(tx, &existing.id).await?;

            return Ok(Finalized::Replayed(order));
        }

        let lines = self.cart_items.get_cart_lines(tx, request.cart).await?;
        let mut cart = header.into_cart(lines);
        let state = cart.state();

        if state != CartState::Active {
            return Err(CheckoutFailure::CartNotActive(state));
        }

        if cart.is_empty() {
            return Err(CheckoutFailure::CartEmpty);
        }

        if let Some(line) = cart.lines().iter().find(|line| !line.item.permits_transaction()) {
            return Err(CheckoutFailure::ItemUnavailable(line.item.id));
        }

        let order_lines: Vec<OrderLine> = cart.lines().iter().map(OrderLine::freeze).collect();
        let subtotal: Decimal = order_lines.iter().map(OrderLine::subtotal).sum();

        cart.transition_to(CartState::CheckedOut)
            .map_err(|_| CheckoutFailure::CartNotActive(state))?;

        let changed = self
            .carts
            .transition_cart(tx, request.cart, CartState::Active, CartState::CheckedOut)
            .await?;

        if changed == 0 {
            return Err(CheckoutFailure::CartNotActive(state));
        }

        advance(stage, CheckoutStage::ItemsConverted);

        let discount = match normalize_code(request.discount_code.as_deref()) {
            Some(code) => {
                let discount_code = self
                    .discounts
                    .lock_code(tx, code)
                    .await?
                    .ok_or_else(|| DiscountError::UnknownCode(code.to_string()))?;

                discount_code.validate(today)?;

                let amount = discount_code.amount_for(subtotal);

                Some((discount_code, amount))
            }
            None => None,
        };

        advance(stage, CheckoutStage::DiscountApplied);

        let tax_rate = self.taxes.rate(tx).await?;

        let instrument = self
            .instruments
            .get_instrument(tx, request.payment_instrument)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    CheckoutFailure::InstrumentNotFound(request.payment_instrument)
                }
                other => CheckoutFailure::Persistence(other),
            })?;

        if !instrument.is_owned_by(cart.user_id()) {
            return Err(CheckoutFailure::InstrumentNotOwned(request.payment_instrument));
        }

        let mut order = Order::new(OrderParts {
            id: OrderId::generate(),
            user_id: cart.user_id(),
            created_at: now,
            payment_instrument_id: instrument.id(),
            discount_code: discount.as_ref().map(|(code, _)| code.code.clone()),
            discount: discount.as_ref().map_or(Decimal::ZERO, |(_, amount)| *amount),
            tax_rate,
            status: OrderStatus::Pending,
            lines: order_lines,
        })?;

        Span::current().record("order_id", order.id().as_str());

        self.orders
            .create_order(
                tx,
                NewOrderHeader {
                    order: &order,
                    cart: request.cart,
                    idempotency_key: &request.idempotency_key,
                },
            )
            .await?;

        advance(stage, CheckoutStage::OrderPersisted);

        self.charge(instrument, order.total(), request).await?;

        advance(stage, CheckoutStage::PaymentCharged);

        order.advance_state(OrderStatus::Paid)?;

        let changed = self
            .orders
            .transition_order(tx, order.id(), OrderStatus::Pending, OrderStatus::Paid)
            .await?;

        if changed == 0 {
            return Err(CheckoutFailure::Persistence(sqlx::Error::RowNotFound));
        }

        self.history
            .create_history(
                tx,
                &PurchaseRecord {
                    user_id: order.user_id(),
                    order_id: order.id().clone(),
                    purchased_on: today,
                    total: order.total(),
                },
            )
            .await?;

        let entries = LibraryEntry::from_order(&order, now);

        self.library
            .create_order_entries(tx, order.user_id(), order.id(), now, &entries)
            .await?;

        if let Some((code, amount)) = &discount {
            self.discounts
                .create_redemption(tx, order.id(), &code.code, *amount, now)
                .await?;

            if code.is_single_use() {
                let consumed = self.discounts.consume_code(tx, &code.code, now).await?;

                if consumed == 0 {
                    return Err(DiscountError::AlreadyConsumed(code.code.clone()).into());
                }
            }
        }

        advance(stage, CheckoutStage::LibraryUpdated);

        Ok(Finalized::Created(order))
    }

    async fn charge(
        &self,
        instrument: PaymentInstrument,
        amount: Decimal,
        request: &FinalizeOrder,
    ) -> Result<(), CheckoutFailure> {
        let charge = self.payments.charge(ChargeRequest {
            instrument,
            amount,
            idempotency_key: request.idempotency_key.clone(),
        });

        match timeout(self.payment_timeout, charge).await {
            Ok(Ok(receipt)) => {
                debug!(transaction_uuid = %receipt.transaction_id, "payment captured");

                Ok(())
            }
            Ok(Err(PaymentError::Declined(declined))) => Err(declined.into()),
            Ok(Err(error)) => Err(CheckoutFailure::PaymentFailed(error)),
            Err(_) => Err(CheckoutFailure::PaymentTimedOut(self.payment_timeout)),
        }
    }
}

fn advance(stage: &mut CheckoutStage, next: CheckoutStage) {
    *stage = next;

    Span::current().record("stage", next.as_str());

    debug!(stage = %next, "checkout advanced");
}

#[async_trait]
impl OrderFinalizer for PgOrderFinalizer {
    #[tracing::instrument(
        name = "checkout.finalizer.finalize",
        skip(self, request),
        fields(
            cart_uuid = %request.cart,
            payment_instrument_uuid = %request.payment_instrument,
            idempotency_key = %request.idempotency_key,
            stage = CheckoutStage::Started.as_str(),
            order_id = tracing::field::Empty
        ),
        err
    )]
    async fn finalize(&self, request: FinalizeOrder) -> Result<Order, CheckoutError> {
        let mut stage = CheckoutStage::Started;

        let mut tx = self
            .db
            .begin_transaction()
            .await
            .map_err(|e| CheckoutError::new(stage, e))?;

        match self.run(&mut tx, &request, &mut stage).await {
            Ok(Finalized::Created(order)) => {
                tx.commit().await.map_err(|e| {
                    warn!(order_id = %order.id(), "payment captured but commit failed");

                    CheckoutError::new(stage, e)
                })?;

                advance(&mut stage, CheckoutStage::Committed);

                info!(order_id = %order.id(), total = %order.total(), "order finalized");

                Ok(order)
            }
            Ok(Finalized::Replayed(order)) => {
                tx.commit().await.map_err(|e| CheckoutError::new(stage, e))?;

                Span::current().record("order_id", order.id().as_str());

                info!(order_id = %order.id(), "returning order committed by an earlier attempt");

                Ok(order)
            }
            Err(reason) => {
                if let Err(error) = tx.rollback().await {
                    warn!(%error, "rollback failed");
                }

                if stage >= CheckoutStage::PaymentCharged {
                    warn!(
                        %stage,
                        "payment captured but checkout rolled back; retry with the same idempotency key"
                    );
                }

                Err(CheckoutError { stage, reason })
            }
        }
    }
}

#[automock]
#[async_trait]
pub trait OrderFinalizer: Send + Sync {
    /// Converts an active cart into a paid order, or leaves no trace.
    async fn finalize(&self, request: FinalizeOrder) -> Result<Order, CheckoutError>;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::task::JoinSet;

    use jiff::ToSpan;
    use mival::{
        carts::{Cart, CartUuid},
        catalog::{CatalogItem, CatalogItemStatus},
        discounts::DiscountKind,
        orders::OrderError,
        payments::{IdempotencyKey, PaymentDeclined, PaymentReceipt},
        taxes::TaxRate,
        users::User,
    };
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::CartsService,
            catalog::{CatalogService, data::CatalogItemUpdate},
            checkout::errors::ErrorCategory,
            discounts::{DiscountsService, data::NewDiscountCode},
            library::LibraryService,
            orders::OrdersService,
            payments::{MockPaymentProcessor, PgPaymentProcessor},
            taxes::TaxService,
        },
        test::{
            TestContext,
            helpers::{
                charged_amount, count_history, count_library_entries, count_orders,
                count_payment_transactions, create_cart, create_catalog_item, create_credit_card,
                create_debit_card, create_user, new_discount_code,
            },
        },
    };

    use super::*;

    struct Scenario {
        user: User,
        cart: Cart,
        card: PaymentInstrument,
        game: CatalogItem,
    }

    /// Two copies of a 10.00 game and one 5.00 game at 19% VAT: 29.75 due.
    async fn seed(ctx: &TestContext, credit_limit: Decimal) -> TestResult<Scenario> {
        let user = create_user(ctx).await?;
        let game = create_catalog_item(ctx, "Game A", Decimal::new(1000, 2)).await?;
        let other = create_catalog_item(ctx, "Game B", Decimal::new(500, 2)).await?;
        let cart = create_cart(ctx, user.id).await?;

        ctx.carts.add_item(cart.id(), game.id, 2).await?;
        ctx.carts.add_item(cart.id(), other.id, 1).await?;
        ctx.taxes.set_rate("0.19".parse::<TaxRate>()?).await?;

        let card = create_credit_card(ctx, user.id, credit_limit).await?;

        Ok(Scenario {
            user,
            cart,
            card,
            game,
        })
    }

    fn request(scenario: &Scenario, code: Option<&str>) -> FinalizeOrder {
        FinalizeOrder {
            cart: scenario.cart.id(),
            payment_instrument: scenario.card.id(),
            discount_code: code.map(str::to_string),
            idempotency_key: IdempotencyKey::generate(),
        }
    }

    async fn assert_nothing_committed(ctx: &TestContext, scenario: &Scenario) -> TestResult {
        let cart = ctx.carts.get_cart(scenario.cart.id()).await?;

        assert_eq!(cart.state(), CartState::Active);
        assert_eq!(count_orders(ctx, scenario.user.id).await?, 0);
        assert_eq!(count_history(ctx, scenario.user.id).await?, 0);
        assert_eq!(count_library_entries(ctx, scenario.user.id).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn finalize_commits_paid_order_history_and_library() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(30)).await?;
        let request = request(&scenario, None);
        let key = request.idempotency_key.clone();

        let order = ctx.checkout.finalize(request).await?;

        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.total(), Decimal::new(2975, 2));
        assert_eq!(order.lines().len(), 2);

        let cart = ctx.carts.get_cart(scenario.cart.id()).await?;
        let stored = ctx.orders.get_order(order.id()).await?;
        let history = ctx.orders.list_history(scenario.user.id).await?;

        assert_eq!(cart.state(), CartState::CheckedOut);
        assert_eq!(stored, order);
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().map(|h| h.total), Some(Decimal::new(2975, 2)));
        assert_eq!(count_library_entries(&ctx, scenario.user.id).await?, 2);
        assert!(ctx.library.owns_game(scenario.user.id, scenario.game.id).await?);
        assert_eq!(count_payment_transactions(&ctx, &key).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn declined_payment_rolls_back_everything() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(20)).await?;
        let request = request(&scenario, None);
        let key = request.idempotency_key.clone();

        let result = ctx.checkout.finalize(request).await;

        let Err(error) = result else {
            panic!("expected declined checkout, got {result:?}");
        };

        assert_eq!(error.stage, CheckoutStage::OrderPersisted);
        assert_eq!(error.category(), ErrorCategory::PaymentDeclined);
        assert!(!error.is_retryable());
        assert!(
            matches!(
                error.reason,
                CheckoutFailure::PaymentDeclined(PaymentDeclined::CreditLimitExceeded { .. })
            ),
            "expected CreditLimitExceeded, got {:?}",
            error.reason
        );
        assert_eq!(count_payment_transactions(&ctx, &key).await?, 0);

        assert_nothing_committed(&ctx, &scenario).await
    }

    #[tokio::test]
    async fn percentage_code_is_applied_and_consumed_once() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        ctx.discounts
            .create_code(new_discount_code("SAVE10", DiscountKind::Percentage, Decimal::TEN)?)
            .await?;

        let order = ctx
            .checkout
            .finalize(request(&scenario, Some("SAVE10")))
            .await?;

        assert_eq!(order.discount(), Decimal::new(250, 2));
        assert_eq!(order.total(), Decimal::new(26775, 3));
        assert_eq!(order.discount_code(), Some("SAVE10"));

        let code = ctx.discounts.get_code("SAVE10").await?;

        assert!(code.consumed_at.is_some());
        assert_eq!(ctx.discounts.count_redemptions("SAVE10").await?, 1);

        let again = create_cart(&ctx, scenario.user.id).await?;
        ctx.carts.add_item(again.id(), scenario.game.id, 1).await?;

        let result = ctx
            .checkout
            .finalize(FinalizeOrder {
                cart: again.id(),
                ..request(&scenario, Some("SAVE10"))
            })
            .await;

        assert!(
            matches!(
                &result,
                Err(CheckoutError {
                    reason: CheckoutFailure::InvalidDiscount(DiscountError::AlreadyConsumed(_)),
                    ..
                })
            ),
            "expected AlreadyConsumed, got {result:?}"
        );
        assert_eq!(ctx.discounts.count_redemptions("SAVE10").await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn accumulable_code_can_be_redeemed_repeatedly() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        ctx.discounts
            .create_code(accumulable(new_discount_code(
                "FIVEOFF",
                DiscountKind::FixedAmount,
                Decimal::from(5),
            )?))
            .await?;

        ctx.checkout
            .finalize(request(&scenario, Some("FIVEOFF")))
            .await?;

        let again = create_cart(&ctx, scenario.user.id).await?;
        ctx.carts.add_item(again.id(), scenario.game.id, 1).await?;

        let order = ctx
            .checkout
            .finalize(FinalizeOrder {
                cart: again.id(),
                ..request(&scenario, Some("FIVEOFF"))
            })
            .await?;

        assert_eq!(order.discount(), Decimal::from(5));
        assert_eq!(ctx.discounts.count_redemptions("FIVEOFF").await?, 2);
        assert!(ctx.discounts.get_code("FIVEOFF").await?.consumed_at.is_none());

        Ok(())
    }

    fn accumulable(mut code: NewDiscountCode) -> NewDiscountCode {
        code.is_accumulable = true;
        code
    }

    #[tokio::test]
    async fn expired_code_aborts_without_side_effects() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;
        let today = Timestamp::now().to_zoned(TimeZone::UTC).date();

        let mut code = new_discount_code("OLD", DiscountKind::Percentage, Decimal::TEN)?;
        code.starts_on = today.checked_sub(30.days())?;
        code.ends_on = today.yesterday()?;
        ctx.discounts.create_code(code).await?;

        let result = ctx.checkout.finalize(request(&scenario, Some("OLD"))).await;

        let Err(error) = result else {
            panic!("expected expired code to fail, got {result:?}");
        };

        assert_eq!(error.stage, CheckoutStage::ItemsConverted);
        assert_eq!(error.category(), ErrorCategory::InvalidDiscount);
        assert!(
            matches!(error.reason, CheckoutFailure::InvalidDiscount(DiscountError::Expired { .. })),
            "expected Expired, got {:?}",
            error.reason
        );

        assert_nothing_committed(&ctx, &scenario).await
    }

    #[tokio::test]
    async fn unknown_code_is_an_invalid_discount() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        let result = ctx.checkout.finalize(request(&scenario, Some("NOPE"))).await;

        assert!(
            matches!(
                &result,
                Err(CheckoutError {
                    reason: CheckoutFailure::InvalidDiscount(DiscountError::UnknownCode(code)),
                    ..
                }) if code == "NOPE"
            ),
            "expected UnknownCode, got {result:?}"
        );

        assert_nothing_committed(&ctx, &scenario).await
    }

    #[tokio::test]
    async fn blank_code_means_no_discount() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        let order = ctx.checkout.finalize(request(&scenario, Some("   "))).await?;

        assert_eq!(order.discount(), Decimal::ZERO);
        assert_eq!(order.discount_code(), None);

        Ok(())
    }

    #[tokio::test]
    async fn fixed_discount_above_subtotal_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        ctx.discounts
            .create_code(new_discount_code("HUGE", DiscountKind::FixedAmount, Decimal::from(50))?)
            .await?;

        let result = ctx.checkout.finalize(request(&scenario, Some("HUGE"))).await;

        let Err(error) = result else {
            panic!("expected oversized discount to fail, got {result:?}");
        };

        assert_eq!(error.category(), ErrorCategory::Validation);
        assert!(
            matches!(error.reason, CheckoutFailure::InvalidOrder(OrderError::NegativeTotal { .. })),
            "expected NegativeTotal, got {:?}",
            error.reason
        );
        assert!(ctx.discounts.get_code("HUGE").await?.consumed_at.is_none());

        assert_nothing_committed(&ctx, &scenario).await
    }

    #[tokio::test]
    async fn order_prices_are_frozen_at_checkout() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        let order = ctx.checkout.finalize(request(&scenario, None)).await?;

        ctx.catalog
            .update_item(
                scenario.game.id,
                CatalogItemUpdate {
                    price: Decimal::from(99),
                    status: CatalogItemStatus::Available,
                },
            )
            .await?;

        let stored = ctx.orders.get_order(order.id()).await?;
        let line = stored.lines().iter().find(|l| l.item_id == scenario.game.id);

        assert_eq!(line.map(|l| l.unit_price), Some(Decimal::new(1000, 2)));
        assert_eq!(stored.total(), Decimal::new(2975, 2));

        Ok(())
    }

    #[tokio::test]
    async fn discontinued_item_blocks_checkout() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        ctx.catalog
            .update_item(
                scenario.game.id,
                CatalogItemUpdate {
                    price: scenario.game.price,
                    status: CatalogItemStatus::Discontinued,
                },
            )
            .await?;

        let result = ctx.checkout.finalize(request(&scenario, None)).await;

        assert!(
            matches!(
                &result,
                Err(CheckoutError {
                    reason: CheckoutFailure::ItemUnavailable(id),
                    ..
                }) if *id == scenario.game.id
            ),
            "expected ItemUnavailable, got {result:?}"
        );

        assert_nothing_committed(&ctx, &scenario).await
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_finalized() -> TestResult {
        let ctx = TestContext::new().await;
        let user = create_user(&ctx).await?;
        let cart = create_cart(&ctx, user.id).await?;
        let card = create_credit_card(&ctx, user.id, Decimal::from(100)).await?;

        let result = ctx
            .checkout
            .finalize(FinalizeOrder {
                cart: cart.id(),
                payment_instrument: card.id(),
                discount_code: None,
                idempotency_key: IdempotencyKey::generate(),
            })
            .await;

        let Err(error) = result else {
            panic!("expected empty cart to fail, got {result:?}");
        };

        assert!(matches!(error.reason, CheckoutFailure::CartEmpty));
        assert_eq!(error.category(), ErrorCategory::Validation);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_cart_is_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        let result = ctx
            .checkout
            .finalize(FinalizeOrder {
                cart: CartUuid::new(),
                ..request(&scenario, None)
            })
            .await;

        let Err(error) = result else {
            panic!("expected unknown cart to fail, got {result:?}");
        };

        assert_eq!(error.category(), ErrorCategory::NotFound);
        assert_eq!(error.stage, CheckoutStage::Started);

        Ok(())
    }

    #[tokio::test]
    async fn another_users_card_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;
        let stranger = create_user(&ctx).await?;
        let card = create_credit_card(&ctx, stranger.id, Decimal::from(100)).await?;

        let result = ctx
            .checkout
            .finalize(FinalizeOrder {
                payment_instrument: card.id(),
                ..request(&scenario, None)
            })
            .await;

        assert!(
            matches!(
                &result,
                Err(CheckoutError {
                    reason: CheckoutFailure::InstrumentNotOwned(_),
                    ..
                })
            ),
            "expected InstrumentNotOwned, got {result:?}"
        );

        assert_nothing_committed(&ctx, &scenario).await
    }

    #[tokio::test]
    async fn checked_out_cart_cannot_be_finalized_again() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        ctx.checkout.finalize(request(&scenario, None)).await?;

        let result = ctx.checkout.finalize(request(&scenario, None)).await;

        let Err(error) = result else {
            panic!("expected second checkout to fail, got {result:?}");
        };

        assert!(
            matches!(error.reason, CheckoutFailure::CartNotActive(CartState::CheckedOut)),
            "expected CartNotActive, got {:?}",
            error.reason
        );
        assert_eq!(error.category(), ErrorCategory::InvalidState);
        assert_eq!(count_orders(&ctx, scenario.user.id).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_finalize_of_one_cart_yields_one_order() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        let (first, second) = tokio::join!(
            ctx.checkout.finalize(request(&scenario, None)),
            ctx.checkout.finalize(request(&scenario, None)),
        );

        let results = [first, second];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(CheckoutError {
                        reason: CheckoutFailure::CartNotActive(CartState::CheckedOut),
                        ..
                    })
                )
            })
            .count();

        assert_eq!(succeeded, 1, "results: {results:?}");
        assert_eq!(rejected, 1, "results: {results:?}");
        assert_eq!(count_orders(&ctx, scenario.user.id).await?, 1);
        assert_eq!(count_library_entries(&ctx, scenario.user.id).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn retry_with_same_key_returns_committed_order() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;
        let request = request(&scenario, None);

        let first = ctx.checkout.finalize(request.clone()).await?;
        let second = ctx.checkout.finalize(request.clone()).await?;

        assert_eq!(first, second);
        assert_eq!(count_orders(&ctx, scenario.user.id).await?, 1);
        assert_eq!(count_payment_transactions(&ctx, &request.idempotency_key).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn reusing_a_key_for_another_cart_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;
        let request = request(&scenario, None);

        ctx.checkout.finalize(request.clone()).await?;

        let other = create_cart(&ctx, scenario.user.id).await?;
        ctx.carts.add_item(other.id(), scenario.game.id, 1).await?;

        let result = ctx
            .checkout
            .finalize(FinalizeOrder {
                cart: other.id(),
                ..request
            })
            .await;

        let Err(error) = result else {
            panic!("expected key reuse to fail, got {result:?}");
        };

        assert!(matches!(error.reason, CheckoutFailure::IdempotencyKeyReused(cart) if cart == scenario.cart.id()));
        assert_eq!(error.category(), ErrorCategory::Validation);

        Ok(())
    }

    /// Captures through the real processor, then stalls on the first call.
    struct StallsOnce {
        inner: PgPaymentProcessor,
        stalled: AtomicBool,
        delay: Duration,
    }

    #[async_trait]
    impl PaymentProcessor for StallsOnce {
        async fn charge(&self, request: ChargeRequest) -> Result<PaymentReceipt, PaymentError> {
            let receipt = self.inner.charge(request).await?;

            if !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(self.delay).await;
            }

            Ok(receipt)
        }
    }

    #[tokio::test]
    async fn timed_out_payment_is_not_captured_twice_on_retry() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;
        let request = request(&scenario, None);

        let finalizer = PgOrderFinalizer::new(
            ctx.db(),
            Arc::new(StallsOnce {
                inner: PgPaymentProcessor::new(ctx.ledger_db()),
                stalled: AtomicBool::new(false),
                delay: Duration::from_secs(2),
            }),
            CheckoutSettings {
                payment_timeout: Duration::from_millis(500),
                ..CheckoutSettings::default()
            },
        );

        let result = finalizer.finalize(request.clone()).await;

        let Err(error) = result else {
            panic!("expected timeout, got {result:?}");
        };

        assert!(matches!(error.reason, CheckoutFailure::PaymentTimedOut(_)));
        assert!(error.is_retryable());

        assert_nothing_committed(&ctx, &scenario).await?;

        let order = finalizer.finalize(request.clone()).await?;

        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(count_orders(&ctx, scenario.user.id).await?, 1);
        assert_eq!(count_payment_transactions(&ctx, &request.idempotency_key).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn processor_failure_leaves_nothing_behind() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_charge()
            .times(1)
            .returning(|_| Err(PaymentError::Sql(sqlx::Error::PoolTimedOut)));

        let finalizer =
            PgOrderFinalizer::new(ctx.db(), Arc::new(processor), CheckoutSettings::default());

        let result = finalizer.finalize(request(&scenario, None)).await;

        let Err(error) = result else {
            panic!("expected processor failure, got {result:?}");
        };

        assert_eq!(error.stage, CheckoutStage::OrderPersisted);
        assert_eq!(error.category(), ErrorCategory::Persistence);
        assert!(error.is_retryable());

        assert_nothing_committed(&ctx, &scenario).await
    }

    #[tokio::test]
    async fn missing_vat_setting_uses_fallback_rate() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        sqlx::query("DELETE FROM store_settings")
            .execute(ctx.pool())
            .await?;

        let finalizer = PgOrderFinalizer::new(
            ctx.db(),
            Arc::new(PgPaymentProcessor::new(ctx.ledger_db())),
            CheckoutSettings {
                fallback_tax_rate: "0.16".parse::<TaxRate>()?,
                ..CheckoutSettings::default()
            },
        );

        let order = finalizer.finalize(request(&scenario, None)).await?;

        assert_eq!(order.tax_rate(), "0.16".parse::<TaxRate>()?);
        assert_eq!(order.total(), Decimal::new(2900, 2));

        Ok(())
    }

    #[tokio::test]
    async fn stored_order_total_matches_captured_amount() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        ctx.taxes.set_rate("0.12345".parse::<TaxRate>()?).await?;

        let request = request(&scenario, None);
        let order = ctx.checkout.finalize(request.clone()).await?;

        let charged = charged_amount(&ctx, &request.idempotency_key).await?;
        let stored = ctx.orders.get_order(order.id()).await?;
        let replayed = ctx.checkout.finalize(request).await?;
        let history = ctx.orders.list_history(scenario.user.id).await?;

        assert_eq!(order.total(), Decimal::new(2808_6250, 6));
        assert_eq!(charged, Some(order.total()));
        assert_eq!(stored.total(), order.total());
        assert_eq!(replayed.total(), order.total());
        assert_eq!(history.first().map(|h| h.total), Some(order.total()));

        Ok(())
    }

    #[tokio::test]
    async fn debit_card_checkout_records_one_capture() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;
        let debit = create_debit_card(&ctx, scenario.user.id).await?;
        let request = FinalizeOrder {
            payment_instrument: debit.id(),
            ..request(&scenario, None)
        };

        let order = ctx.checkout.finalize(request.clone()).await?;

        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.payment_instrument_id(), debit.id());
        assert_eq!(count_payment_transactions(&ctx, &request.idempotency_key).await?, 1);
        assert_eq!(
            charged_amount(&ctx, &request.idempotency_key).await?,
            Some(Decimal::new(2975, 2))
        );
        assert_eq!(count_library_entries(&ctx, scenario.user.id).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn checkout_completes_on_a_single_connection_pool() -> TestResult {
        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(100)).await?;

        let finalizer = PgOrderFinalizer::new(
            Db::new(ctx.db.sized_pool(1).await),
            Arc::new(PgPaymentProcessor::new(ctx.ledger_db())),
            CheckoutSettings {
                payment_timeout: Duration::from_secs(2),
                ..CheckoutSettings::default()
            },
        );

        let order = finalizer.finalize(request(&scenario, None)).await?;

        assert_eq!(order.status(), OrderStatus::Paid);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_checkouts_do_not_exhaust_the_pool() -> TestResult {
        const CHECKOUTS: u32 = 8;

        let ctx = TestContext::new().await;
        let scenario = seed(&ctx, Decimal::from(1000)).await?;

        let finalizer = Arc::new(PgOrderFinalizer::new(
            Db::new(ctx.db.sized_pool(CHECKOUTS).await),
            Arc::new(PgPaymentProcessor::new(ctx.ledger_db())),
            CheckoutSettings {
                payment_timeout: Duration::from_secs(3),
                ..CheckoutSettings::default()
            },
        ));

        let mut requests = Vec::new();

        for _ in 0..CHECKOUTS {
            let cart = create_cart(&ctx, scenario.user.id).await?;
            ctx.carts.add_item(cart.id(), scenario.game.id, 1).await?;

            requests.push(FinalizeOrder {
                cart: cart.id(),
                ..request(&scenario, None)
            });
        }

        let mut checkouts = JoinSet::new();

        for request in requests {
            let finalizer = Arc::clone(&finalizer);

            checkouts.spawn(async move { finalizer.finalize(request).await });
        }

        let mut paid = 0;

        while let Some(joined) = checkouts.join_next().await {
            let order = joined??;

            assert_eq!(order.status(), OrderStatus::Paid);

            paid += 1;
        }

        assert_eq!(paid, CHECKOUTS);
        assert_eq!(count_orders(&ctx, scenario.user.id).await?, i64::from(CHECKOUTS));

        Ok(())
    }
}
