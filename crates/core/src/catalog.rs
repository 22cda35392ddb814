//! Catalog

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::TypedUuid;

/// Catalog Item UUID
pub type CatalogItemUuid = TypedUuid<CatalogItem>;

/// Lifecycle status of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogItemStatus {
    /// Listed and purchasable.
    Available,

    /// Announced but not yet purchasable.
    Unreleased,

    /// Withdrawn from sale.
    Discontinued,
}

impl CatalogItemStatus {
    /// Whether an item in this status may be added to a cart or ordered.
    pub fn permits_transaction(self) -> bool {
        matches!(self, Self::Available)
    }

    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Unreleased => "UNRELEASED",
            Self::Discontinued => "DISCONTINUED",
        }
    }
}

impl fmt::Display for CatalogItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status string is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown catalog item status `{0}`")]
pub struct UnknownCatalogItemStatus(pub String);

impl FromStr for CatalogItemStatus {
    type Err = UnknownCatalogItemStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "UNRELEASED" => Ok(Self::Unreleased),
            "DISCONTINUED" => Ok(Self::Discontinued),
            other => Err(UnknownCatalogItemStatus(other.to_string())),
        }
    }
}

/// A purchasable game as loaded from the catalog.
///
/// Treated as an immutable snapshot: a price change in the catalog produces a
/// new snapshot on the next load, it never mutates one already held by a cart
/// line or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Catalog identifier.
    pub id: CatalogItemUuid,
    /// Display title.
    pub title: String,
    /// Developer or publisher.
    pub studio: String,
    /// Genre reference.
    pub genre_id: i64,
    /// Platform reference.
    pub platform_id: i64,
    /// Store page description.
    pub description: String,
    /// Current unit price.
    pub price: Decimal,
    /// Whether the item can be bought.
    pub status: CatalogItemStatus,
}

impl CatalogItem {
    /// Whether this item may currently be transacted.
    pub fn permits_transaction(&self) -> bool {
        self.status.permits_transaction()
    }
}
