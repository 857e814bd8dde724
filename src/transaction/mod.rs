//! Transactions recorded by users.
//!
//! This module contains the `Transaction` model, the `TransactionBuilder` for
//! creating transactions, and the database functions for storing and querying
//! them.

mod core;

pub use core::{
    DEFAULT_CURRENCY, DEFAULT_LOCATION, MAX_LABEL_LENGTH, Transaction, TransactionBuilder,
    count_transactions, create_transaction, delete_transaction, get_transaction,
    get_transaction_category, get_transactions_by_user, map_transaction_row,
    set_transaction_category,
};
