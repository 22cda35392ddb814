//! User Data

use mival::users::UserUuid;

/// New User Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub uuid: UserUuid,
    pub display_name: String,
    pub email: String,
}
