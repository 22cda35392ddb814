//! Catalog Data

use mival::catalog::{CatalogItemStatus, CatalogItemUuid};
use rust_decimal::Decimal;

/// New Catalog Item Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogItem {
    pub uuid: CatalogItemUuid,
    pub title: String,
    pub studio: String,
    pub genre_id: i64,
    pub platform_id: i64,
    pub description: String,
    pub price: Decimal,
    pub status: CatalogItemStatus,
}

/// Catalog Item Update Data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogItemUpdate {
    pub price: Decimal,
    pub status: CatalogItemStatus,
}
