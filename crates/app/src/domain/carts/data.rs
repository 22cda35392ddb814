//! Cart Data

use mival::{carts::CartUuid, users::UserUuid};

/// New Cart Data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCart {
    pub uuid: CartUuid,
    pub user_uuid: UserUuid,
}
