//! Users

use serde::{Deserialize, Serialize};

use crate::ids::TypedUuid;

/// User UUID
pub type UserUuid = TypedUuid<User>;

/// A storefront customer, as exposed by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserUuid,
    /// Name shown in the store.
    pub display_name: String,
    /// Contact address.
    pub email: String,
}
