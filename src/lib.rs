//! Data layer of a personal budgeting backend.
//!
//! The crate owns the SQLite schema of users, their spending categories and
//! their transactions, the versioned migrations that build that schema, and
//! the restricted JSON representation of a user.
//!
//! Open a database with [db::open] and bring it up to date with
//! [initialize_db] before using any of the store functions.

#![warn(missing_docs)]

pub mod category;
mod database_id;
pub mod db;
mod error;
pub mod logging;
pub mod migration;
mod password;
pub mod transaction;
pub mod user;

pub use database_id::{CategoryId, DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use password::{PasswordHash, ValidatedPassword};
pub use user::{User, UserID};
