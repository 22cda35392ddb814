//! Integration tests for checkout arithmetic across carts, discounts, taxes,
//! orders and payment instruments.

use jiff::{Timestamp, civil::date};
use rust_decimal::Decimal;
use testresult::TestResult;

use mival::{
    carts::{Cart, CartUuid},
    catalog::{CatalogItem, CatalogItemStatus, CatalogItemUuid},
    discounts::{DiscountCode, DiscountKind},
    orders::{Order, OrderId, OrderLine, OrderParts, OrderStatus},
    payments::{
        CardDetails, Chargeable, CreditCard, PaymentDeclined, PaymentInstrument,
        PaymentInstrumentUuid,
    },
    taxes::TaxRate,
    users::UserUuid,
};

fn game(title: &str, price: Decimal) -> CatalogItem {
    CatalogItem {
        id: CatalogItemUuid::new(),
        title: title.to_string(),
        studio: "Studio".to_string(),
        genre_id: 1,
        platform_id: 1,
        description: String::new(),
        price,
        status: CatalogItemStatus::Available,
    }
}

fn scenario_cart(user: UserUuid) -> TestResult<Cart> {
    let mut cart = Cart::new(CartUuid::new(), user, Timestamp::now());

    cart.add_item(game("Item A", Decimal::new(1000, 2)), 2)?;
    cart.add_item(game("Item B", Decimal::new(500, 2)), 1)?;

    Ok(cart)
}

fn order_for(cart: &Cart, discount: Decimal, tax_rate: TaxRate) -> TestResult<Order> {
    Ok(Order::new(OrderParts {
        id: OrderId::generate(),
        user_id: cart.user_id(),
        created_at: Timestamp::now(),
        payment_instrument_id: PaymentInstrumentUuid::new(),
        discount_code: None,
        discount,
        tax_rate,
        status: OrderStatus::Pending,
        lines: cart.lines().iter().map(OrderLine::freeze).collect(),
    })?)
}

fn credit_card(user: UserUuid, limit: Decimal) -> PaymentInstrument {
    PaymentInstrument::Credit(CreditCard {
        card: CardDetails {
            id: PaymentInstrumentUuid::new(),
            user_id: user,
            holder_name: "Grace Hopper".to_string(),
            masked_number: "4111****1111".to_string(),
            expires_on: date(2031, 1, 31),
        },
        credit_limit: limit,
    })
}

#[test]
fn undiscounted_cart_is_taxed_at_configured_rate() -> TestResult {
    let user = UserUuid::new();
    let cart = scenario_cart(user)?;
    let order = order_for(&cart, Decimal::ZERO, "0.19".parse()?)?;

    assert_eq!(cart.total(), Decimal::new(2500, 2));
    assert_eq!(order.subtotal(), cart.total());
    assert_eq!(order.total(), Decimal::new(2975, 2));

    Ok(())
}

#[test]
fn credit_limit_gates_the_charge() -> TestResult {
    let user = UserUuid::new();
    let cart = scenario_cart(user)?;
    let order = order_for(&cart, Decimal::ZERO, "0.19".parse()?)?;

    credit_card(user, Decimal::from(30)).authorize(order.total())?;

    assert_eq!(
        credit_card(user, Decimal::from(20)).authorize(order.total()),
        Err(PaymentDeclined::CreditLimitExceeded {
            limit: Decimal::from(20),
            amount: Decimal::new(2975, 2),
        })
    );

    Ok(())
}

#[test]
fn percentage_code_is_taken_before_tax() -> TestResult {
    let user = UserUuid::new();
    let cart = scenario_cart(user)?;

    let code = DiscountCode {
        code: "TENOFF".to_string(),
        value: Decimal::TEN,
        kind: DiscountKind::Percentage,
        starts_on: date(2024, 1, 1),
        ends_on: date(2024, 12, 31),
        is_active: true,
        is_accumulable: false,
        consumed_at: None,
    };

    code.validate(date(2024, 6, 1))?;

    let discount = code.amount_for(cart.total());
    let order = order_for(&cart, discount, "0.19".parse()?)?;

    assert_eq!(discount, Decimal::new(250, 2));
    assert_eq!(order.total(), Decimal::new(26775, 3));

    Ok(())
}

#[test]
fn order_prices_do_not_follow_catalog_changes() -> TestResult {
    let user = UserUuid::new();
    let mut cart = Cart::new(CartUuid::new(), user, Timestamp::now());
    let item = game("Item A", Decimal::new(1000, 2));

    cart.add_item(item.clone(), 1)?;

    let order = order_for(&cart, Decimal::ZERO, TaxRate::ZERO)?;

    cart.add_item(
        CatalogItem {
            price: Decimal::new(9900, 2),
            ..item
        },
        1,
    )?;

    assert_eq!(cart.total(), Decimal::new(19800, 2));
    assert_eq!(order.total(), Decimal::new(1000, 2));

    Ok(())
}
