//! Per-user spending categories with a monthly budget.
//!
//! A transaction may belong to at most one category. Deleting a category does
//! not touch its transactions, see [crate::transaction::get_transaction_category].

mod db;
mod domain;

pub use db::{create_category, delete_category, get_categories_by_user, get_category, update_category};
pub use domain::{
    Category, CategoryColor, CategoryTitle, MAX_TITLE_LENGTH, MonthlyBudget, NewCategory,
};
