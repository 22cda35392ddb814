//! Library Data

use mival::{catalog::CatalogItemUuid, users::UserUuid};

/// A game granted outside of checkout, e.g. a redeemed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLibraryGame {
    pub user_uuid: UserUuid,
    pub item_uuid: CatalogItemUuid,
    pub activation_key: String,
}
