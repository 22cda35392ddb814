//! Game library
//!
//! The library is append-only. Buying the same game twice produces two
//! entries.

use jiff::Timestamp;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{CatalogItem, CatalogItemUuid},
    orders::{Order, OrderId},
    users::UserUuid,
};

/// A record granting a user ownership of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Owner.
    pub user_id: UserUuid,
    /// Owned game.
    pub item_id: CatalogItemUuid,
    /// When ownership was granted.
    pub purchased_at: Timestamp,

    /// Present for manually granted games; order fulfilment leaves it empty.
    pub activation_key: Option<String>,

    /// The order that granted the game, if any.
    pub order_id: Option<OrderId>,
}

impl LibraryEntry {
    /// One entry per distinct catalog item in `order`, in line order.
    pub fn from_order(order: &Order, purchased_at: Timestamp) -> Vec<Self> {
        let mut seen = FxHashSet::default();

        order
            .lines()
            .iter()
            .filter(|line| seen.insert(line.item_id))
            .map(|line| Self {
                user_id: order.user_id(),
                item_id: line.item_id,
                purchased_at,
                activation_key: None,
                order_id: Some(order.id().clone()),
            })
            .collect()
    }
}

/// A library entry joined with its catalog item, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedGame {
    /// The owned game.
    pub item: CatalogItem,
    /// When ownership was granted.
    pub purchased_at: Timestamp,
    /// Activation key, for manually granted games.
    pub activation_key: Option<String>,
}
