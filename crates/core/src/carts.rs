//! Carts

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::{CatalogItem, CatalogItemUuid},
    ids::TypedUuid,
    users::UserUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<Cart>;

/// Cart lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartState {
    /// Open for changes.
    Active,

    /// Converted into a paid order.
    CheckedOut,

    /// Left behind by the customer; may be reopened.
    Abandoned,
}

impl CartState {
    /// Allowed transitions: `Active` may be checked out or abandoned, an
    /// abandoned cart may be reopened, and `CheckedOut` is terminal.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::CheckedOut | Self::Abandoned) | (Self::Abandoned, Self::Active)
        )
    }

    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::CheckedOut => "CHECKED_OUT",
            Self::Abandoned => "ABANDONED",
        }
    }
}

impl fmt::Display for CartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored cart state string is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown cart state `{0}`")]
pub struct UnknownCartState(pub String);

impl FromStr for CartState {
    type Err = UnknownCartState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "CHECKED_OUT" => Ok(Self::CheckedOut),
            "ABANDONED" => Ok(Self::Abandoned),
            other => Err(UnknownCartState(other.to_string())),
        }
    }
}

/// Errors raised by cart operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantities must be strictly positive and fit in a `u32`.
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    /// Line items can only change while the cart is active.
    #[error("cart is {0}, not ACTIVE")]
    NotActive(CartState),

    /// The catalog item's status does not permit transactions.
    #[error("catalog item {0} is not available for purchase")]
    ItemUnavailable(CatalogItemUuid),

    /// No line exists for the catalog item.
    #[error("catalog item {0} is not in the cart")]
    LineNotFound(CatalogItemUuid),

    /// The requested state change is not in the transition table.
    #[error("invalid cart transition from {from} to {to}")]
    InvalidTransition { from: CartState, to: CartState },
}

/// A line in a cart.
///
/// The subtotal is derived from the live catalog snapshot held by the line,
/// never stored independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog snapshot, including its current price.
    pub item: CatalogItem,
    /// Number of copies.
    pub quantity: u32,
}

impl CartLine {
    /// `quantity × current unit price`.
    pub fn subtotal(&self) -> Decimal {
        self.item.price * Decimal::from(self.quantity)
    }
}

/// A user's pre-checkout collection of games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartUuid,
    user_id: UserUuid,
    created_at: Timestamp,
    state: CartState,
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty, active cart.
    pub fn new(id: CartUuid, user_id: UserUuid, created_at: Timestamp) -> Self {
        Self {
            id,
            user_id,
            created_at,
            state: CartState::Active,
            lines: Vec::new(),
        }
    }

    /// Rebuilds a cart from stored parts.
    pub fn restore(
        id: CartUuid,
        user_id: UserUuid,
        created_at: Timestamp,
        state: CartState,
        lines: Vec<CartLine>,
    ) -> Self {
        Self {
            id,
            user_id,
            created_at,
            state,
            lines,
        }
    }

    /// Cart identifier.
    pub fn id(&self) -> CartUuid {
        self.id
    }

    /// Owner of the cart.
    pub fn user_id(&self) -> UserUuid {
        self.user_id
    }

    /// When the cart was opened.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CartState {
        self.state
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line for a catalog item, if any.
    pub fn line(&self, item: CatalogItemUuid) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.item.id == item)
    }

    /// Adds `quantity` units of `item`.
    ///
    /// An existing line for the same item is merged: its quantity grows and it
    /// takes the snapshot passed in, so the subtotal reflects the current
    /// catalog price rather than the price at first add.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`] when `quantity` is zero or the merged
    ///   quantity overflows.
    /// - [`CartError::NotActive`] when the cart is not active.
    /// - [`CartError::ItemUnavailable`] when the item may not be transacted.
    pub fn add_item(&mut self, item: CatalogItem, quantity: u32) -> Result<&CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        self.ensure_active()?;

        if !item.permits_transaction() {
            return Err(CartError::ItemUnavailable(item.id));
        }

        let position = match self.lines.iter().position(|line| line.item.id == item.id) {
            Some(position) => {
                let line = self
                    .lines
                    .get_mut(position)
                    .ok_or(CartError::LineNotFound(item.id))?;

                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::InvalidQuantity)?;
                line.item = item;

                position
            }
            None => {
                self.lines.push(CartLine { item, quantity });
                self.lines.len() - 1
            }
        };

        self.lines
            .get(position)
            .ok_or(CartError::InvalidQuantity)
    }

    /// Replaces the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`] when `quantity` is zero.
    /// - [`CartError::NotActive`] when the cart is not active.
    /// - [`CartError::LineNotFound`] when the item has no line.
    pub fn update_quantity(
        &mut self,
        item: CatalogItemUuid,
        quantity: u32,
    ) -> Result<&CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        self.ensure_active()?;

        let line = self
            .lines
            .iter_mut()
            .find(|line| line.item.id == item)
            .ok_or(CartError::LineNotFound(item))?;

        line.quantity = quantity;

        Ok(line)
    }

    /// Removes the line for `item` and returns it.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotActive`] when the cart is not active.
    /// - [`CartError::LineNotFound`] when the item has no line.
    pub fn remove_item(&mut self, item: CatalogItemUuid) -> Result<CartLine, CartError> {
        self.ensure_active()?;

        let position = self
            .lines
            .iter()
            .position(|line| line.item.id == item)
            .ok_or(CartError::LineNotFound(item))?;

        Ok(self.lines.remove(position))
    }

    /// Sum of line subtotals; zero for an empty cart.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Moves the cart to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidTransition`] when the transition table does
    /// not allow it.
    pub fn transition_to(&mut self, next: CartState) -> Result<(), CartError> {
        if !self.state.can_transition_to(next) {
            return Err(CartError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        self.state = next;

        Ok(())
    }

    fn ensure_active(&self) -> Result<(), CartError> {
        if self.state == CartState::Active {
            Ok(())
        } else {
            Err(CartError::NotActive(self.state))
        }
    }
}
