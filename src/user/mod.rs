//! Users of the application and their external representation.

mod core;
mod projection;

pub use core::{
    NewUser, User, UserID, count_users, create_user, delete_user, get_user_by_email,
    get_user_by_id, set_clerk_id, update_user,
};
pub use projection::{USER_FIELDS, deserialize, serialize, update_user_from_json};

#[cfg(test)]
pub(crate) use core::test_utils;
