//! Orders
//!
//! An order freezes the unit price of every cart line at the moment it is
//! built. Its total is never cached: [`Order::total`] recomputes
//! `(subtotal - discount) × (1 + tax_rate)` on every call.

use std::{fmt, str::FromStr};

use jiff::{Timestamp, civil::Date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    carts::CartLine,
    catalog::CatalogItemUuid,
    payments::PaymentInstrumentUuid,
    taxes::TaxRate,
    users::UserUuid,
};

const ORDER_ID_PREFIX: &str = "PED-";
const ORDER_ID_TOKEN_LEN: usize = 8;

/// Raised when a string is not a well-formed order id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid order id `{0}`, expected `PED-` followed by 8 uppercase hex characters")]
pub struct InvalidOrderId(pub String);

/// Human readable order identifier, `PED-` followed by 8 uppercase hex
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// A fresh random id.
    pub fn generate() -> Self {
        let token: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(ORDER_ID_TOKEN_LEN)
            .collect();

        Self(format!("{ORDER_ID_PREFIX}{}", token.to_ascii_uppercase()))
    }

    /// Validates `id`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOrderId`] if the prefix or token is malformed.
    pub fn parse(id: &str) -> Result<Self, InvalidOrderId> {
        let valid = id.strip_prefix(ORDER_ID_PREFIX).is_some_and(|token| {
            token.len() == ORDER_ID_TOKEN_LEN
                && token
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, 'A'..='F'))
        });

        if valid {
            Ok(Self(id.to_string()))
        } else {
            Err(InvalidOrderId(id.to_string()))
        }
    }

    /// The identifier as text, e.g. `PED-1A2B3C4D`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderId {
    type Err = InvalidOrderId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderId {
    type Error = InvalidOrderId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, awaiting payment.
    Pending,
    /// Payment captured.
    Paid,
    /// Payment failed.
    Failed,
    /// Withdrawn before payment.
    Cancelled,
}

impl OrderStatus {
    /// `Pending` may become `Paid` or `Cancelled`; everything else is final.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Cancelled)
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored order status is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown order status `{0}`")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

/// Errors raised while building or mutating an order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("an order needs at least one line")]
    EmptyOrder,

    #[error("line quantity for {0} must be greater than zero")]
    InvalidQuantity(CatalogItemUuid),

    #[error("discount {0} is negative")]
    NegativeDiscount(Decimal),

    #[error("discount {discount} exceeds order subtotal {subtotal}")]
    NegativeTotal { subtotal: Decimal, discount: Decimal },

    #[error("invalid order transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is {0}; lines can only change while PENDING")]
    NotPending(OrderStatus),

    #[error("catalog item {0} is not part of the order")]
    LineNotFound(CatalogItemUuid),
}

/// An order line with its unit price frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Purchased game.
    pub item_id: CatalogItemUuid,
    /// Title at order time.
    pub title: String,
    /// Unit price at order time.
    pub unit_price: Decimal,
    /// Number of copies.
    pub quantity: u32,
}

impl OrderLine {
    /// Copies the cart line's current price into an order line.
    pub fn freeze(line: &CartLine) -> Self {
        Self {
            item_id: line.item.id,
            title: line.item.title.clone(),
            unit_price: line.item.price,
            quantity: line.quantity,
        }
    }

    /// `unit_price × quantity`.
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Everything needed to build an [`Order`].
#[derive(Debug, Clone)]
pub struct OrderParts {
    /// Order identifier.
    pub id: OrderId,
    /// Buyer.
    pub user_id: UserUuid,
    /// Creation time.
    pub created_at: Timestamp,
    /// Instrument charged for the order.
    pub payment_instrument_id: PaymentInstrumentUuid,
    /// Redeemed discount code, if any.
    pub discount_code: Option<String>,
    /// Amount taken off the subtotal.
    pub discount: Decimal,
    /// VAT rate applied.
    pub tax_rate: TaxRate,
    /// Initial status.
    pub status: OrderStatus,
    /// Frozen lines.
    pub lines: Vec<OrderLine>,
}

/// A purchase, pending or settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserUuid,
    created_at: Timestamp,
    payment_instrument_id: PaymentInstrumentUuid,
    discount_code: Option<String>,
    discount: Decimal,
    tax_rate: TaxRate,
    status: OrderStatus,
    lines: Vec<OrderLine>,
}

impl Order {
    /// Builds an order, enforcing its money invariants.
    ///
    /// # Errors
    ///
    /// - [`OrderError::EmptyOrder`] when there are no lines.
    /// - [`OrderError::InvalidQuantity`] when a line has quantity zero.
    /// - [`OrderError::NegativeDiscount`] when the discount is below zero.
    /// - [`OrderError::NegativeTotal`] when the discount exceeds the subtotal.
    pub fn new(parts: OrderParts) -> Result<Self, OrderError> {
        let OrderParts {
            id,
            user_id,
            created_at,
            payment_instrument_id,
            discount_code,
            discount,
            tax_rate,
            status,
            lines,
        } = parts;

        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity(line.item_id));
        }

        if discount.is_sign_negative() && !discount.is_zero() {
            return Err(OrderError::NegativeDiscount(discount));
        }

        let order = Self {
            id,
            user_id,
            created_at,
            payment_instrument_id,
            discount_code,
            discount,
            tax_rate,
            status,
            lines,
        };

        order.ensure_non_negative()?;

        Ok(order)
    }

    /// Order identifier.
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Buyer.
    pub fn user_id(&self) -> UserUuid {
        self.user_id
    }

    /// Creation time.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Instrument charged for the order.
    pub fn payment_instrument_id(&self) -> PaymentInstrumentUuid {
        self.payment_instrument_id
    }

    /// Redeemed discount code, if any.
    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }

    /// Amount taken off the subtotal.
    pub fn discount(&self) -> Decimal {
        self.discount
    }

    /// VAT rate applied.
    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Frozen lines.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Sum of line subtotals at their frozen prices.
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    /// `(subtotal - discount) × (1 + tax_rate)`.
    pub fn total(&self) -> Decimal {
        (self.subtotal() - self.discount) * self.tax_rate.multiplier()
    }

    /// Tax portion of the total.
    pub fn tax(&self) -> Decimal {
        (self.subtotal() - self.discount) * self.tax_rate.value()
    }

    /// Moves the order to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidTransition`] for transitions outside
    /// `PENDING → {PAID, CANCELLED}`.
    pub fn advance_state(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;

        Ok(())
    }

    /// Changes a line's quantity while the order is still pending.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotPending`] once the order left `PENDING`.
    /// - [`OrderError::InvalidQuantity`] when `quantity` is zero.
    /// - [`OrderError::LineNotFound`] when the item has no line.
    /// - [`OrderError::NegativeTotal`] when the new subtotal falls below the
    ///   discount; the order is left unchanged.
    pub fn set_line_quantity(
        &mut self,
        item: CatalogItemUuid,
        quantity: u32,
    ) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending {
            return Err(OrderError::NotPending(self.status));
        }

        if quantity == 0 {
            return Err(OrderError::InvalidQuantity(item));
        }

        let line = self
            .lines
            .iter_mut()
            .find(|line| line.item_id == item)
            .ok_or(OrderError::LineNotFound(item))?;

        let previous = std::mem::replace(&mut line.quantity, quantity);

        if let Err(err) = self.ensure_non_negative() {
            if let Some(line) = self.lines.iter_mut().find(|line| line.item_id == item) {
                line.quantity = previous;
            }

            return Err(err);
        }

        Ok(())
    }

    fn ensure_non_negative(&self) -> Result<(), OrderError> {
        let subtotal = self.subtotal();

        if self.discount > subtotal {
            return Err(OrderError::NegativeTotal {
                subtotal,
                discount: self.discount,
            });
        }

        Ok(())
    }
}

/// A row in a user's purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Buyer.
    pub user_id: UserUuid,
    /// Paid order.
    pub order_id: OrderId,
    /// Day of purchase.
    pub purchased_on: Date,
    /// Amount charged.
    pub total: Decimal,
}
