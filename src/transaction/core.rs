//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::{Category, get_category},
    database_id::{CategoryId, TransactionId},
    user::UserID,
};

/// The currency recorded for a transaction when none is given.
pub const DEFAULT_CURRENCY: &str = "USD";
/// The location recorded for a transaction when none is given.
pub const DEFAULT_LOCATION: &str = "USA";
/// The maximum number of characters in a currency or location.
pub const MAX_LABEL_LENGTH: usize = 255;

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The ID of the category the transaction was filed under.
    ///
    /// The category may have been deleted since, use
    /// [get_transaction_category] to resolve it.
    pub category_id: Option<CategoryId>,
    /// The user that recorded the transaction.
    pub user_id: UserID,
    /// The currency the amount is in, e.g. "USD".
    pub currency: String,
    /// Where the transaction happened, e.g. "USA".
    pub location: String,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, description: &str, user_id: UserID) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            description: description.to_owned(),
            user_id,
            category_id: None,
            currency: DEFAULT_CURRENCY.to_owned(),
            location: DEFAULT_LOCATION.to_owned(),
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Optional fields start with their defaults: no category, [DEFAULT_CURRENCY]
/// and [DEFAULT_LOCATION]. Pass the finished builder to [create_transaction].
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// let transaction = Transaction::build(-45.99, date!(2025 - 01 - 15), "Coffee", user.id)
///     .category_id(Some(groceries.id))
///     .currency("NZD")
///     .location("New Zealand");
/// let transaction = create_transaction(transaction, &connection)?;
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    ///
    /// Positive values represent income, negative values represent expenses.
    pub amount: f64,

    /// The date when the transaction occurred.
    pub date: Date,

    /// A human-readable description of the transaction.
    pub description: String,

    /// The user recording the transaction.
    pub user_id: UserID,

    /// The category of the transaction, must belong to `user_id`.
    pub category_id: Option<CategoryId>,

    /// The currency of `amount`.
    pub currency: String,

    /// Where the transaction happened.
    pub location: String,
}

impl TransactionBuilder {
    /// Set the category id for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the currency for the transaction.
    pub fn currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_owned();
        self
    }

    /// Set the location for the transaction.
    pub fn location(mut self, location: &str) -> Self {
        self.location = location.to_owned();
        self
    }
}

fn validate_label(label: &str, to_error: fn(String) -> Error) -> Result<(), Error> {
    if label.trim().is_empty() || label.chars().count() > MAX_LABEL_LENGTH {
        Err(to_error(label.to_owned()))
    } else {
        Ok(())
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCurrency] or [Error::InvalidLocation] if either is empty
///   or longer than [MAX_LABEL_LENGTH] characters,
/// - [Error::InvalidCategory] if the category ID does not refer to a category
///   owned by the same user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_label(&builder.currency, Error::InvalidCurrency)?;
    validate_label(&builder.location, Error::InvalidLocation)?;
    check_category_owner(builder.category_id, builder.user_id, connection)?;

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (amount, date, description, category_id, user_id, currency, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, amount, date, description, category_id, user_id, currency, location",
        )?
        .query_row(
            (
                builder.amount,
                builder.date,
                &builder.description,
                builder.category_id,
                builder.user_id.as_i64(),
                &builder.currency,
                &builder.location,
            ),
            map_transaction_row,
        )?;

    tracing::debug!(
        "Created transaction {} for user {}",
        transaction.id,
        transaction.user_id
    );

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, amount, date, description, category_id, user_id, currency, location
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve the transactions of a user, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, amount, date, description, category_id, user_id, currency, location
             FROM \"transaction\" WHERE user_id = :user_id
             ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// File a transaction under `category_id`, or remove its category with `None`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a transaction,
/// - [Error::InvalidCategory] if the category does not belong to the owner of
///   the transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn set_transaction_category(
    id: TransactionId,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<(), Error> {
    let user_id = match get_transaction(id, connection) {
        Ok(transaction) => transaction.user_id,
        Err(Error::NotFound) => return Err(Error::UpdateMissingTransaction),
        Err(error) => return Err(error),
    };

    check_category_owner(category_id, user_id, connection)?;

    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET category_id = ?1 WHERE id = ?2",
        (category_id, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete a transaction by ID.
///
/// # Errors
/// This function will return a [Error::DeleteMissingTransaction] if the
/// transaction does not exist, or [Error::SqlError] for other SQL errors.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Resolve the category of `transaction`.
///
/// Category IDs are not cleared when their category is deleted, a dangling ID
/// resolves to `None` just like a transaction without a category.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transaction_category(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    let Some(category_id) = transaction.category_id else {
        return Ok(None);
    };

    match get_category(category_id, connection) {
        Ok(category) => Ok(Some(category)),
        Err(Error::NotFound) => {
            tracing::warn!(
                "Transaction {} refers to category {category_id} which no longer exists",
                transaction.id
            );
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

fn check_category_owner(
    category_id: Option<CategoryId>,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(id) = category_id else {
        return Ok(());
    };

    let owner: Option<i64> = connection
        .query_row("SELECT user_id FROM category WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;

    match owner {
        Some(owner) if owner == user_id.as_i64() => Ok(()),
        _ => Err(Error::InvalidCategory(category_id)),
    }
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let date = row.get(2)?;
    let description = row.get(3)?;
    let category_id = row.get(4)?;
    let user_id = UserID::new(row.get(5)?);
    let currency = row.get(6)?;
    let location = row.get(7)?;

    Ok(Transaction {
        id,
        amount,
        date,
        description,
        category_id,
        user_id,
        currency,
        location,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use std::str::FromStr;

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        category::{
            Category, CategoryColor, CategoryTitle, MonthlyBudget, NewCategory, create_category,
            delete_category, get_categories_by_user,
        },
        transaction::{
            Transaction, count_transactions, create_transaction, delete_transaction,
            get_transaction, get_transaction_category, get_transactions_by_user,
            set_transaction_category,
        },
        user::{
            User, delete_user,
            test_utils::{get_test_connection, insert_test_user},
        },
    };

    use super::MAX_LABEL_LENGTH;

    fn insert_category(user: &User, connection: &Connection) -> Category {
        create_category(
            NewCategory {
                title: CategoryTitle::new_unchecked("Groceries"),
                monthly_budget: MonthlyBudget::from_str("400").unwrap(),
                color: CategoryColor::new_unchecked("#aabbcc"),
                user_id: user.id,
            },
            connection,
        )
        .expect("Could not create category")
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let amount = 12.3;

        let result = create_transaction(
            Transaction::build(amount, date!(2025 - 10 - 05), "", user.id),
            &conn,
        );

        match result {
            Ok(transaction) => {
                assert_eq!(transaction.amount, amount);
                assert_eq!(transaction.user_id, user.id);
            }
            Err(error) => panic!("Unexpected error: {error}"),
        }
    }

    #[test]
    fn create_uses_default_currency_and_location() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);

        let transaction = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "", user.id),
            &conn,
        )
        .unwrap();

        assert_eq!(transaction.currency, "USD");
        assert_eq!(transaction.location, "USA");
    }

    #[test]
    fn create_with_currency_and_location() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);

        let transaction = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "Flat white", user.id)
                .currency("NZD")
                .location("New Zealand"),
            &conn,
        )
        .unwrap();

        let got = get_transaction(transaction.id, &conn).unwrap();
        assert_eq!(got.currency, "NZD");
        assert_eq!(got.location, "New Zealand");
    }

    #[test]
    fn create_fails_on_empty_currency() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);

        let result = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "", user.id).currency(""),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCurrency(String::new())));
    }

    #[test]
    fn create_fails_on_long_location() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let location = "a".repeat(MAX_LABEL_LENGTH + 1);

        let result = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "", user.id).location(&location),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidLocation(location)));
    }

    #[test]
    fn create_fails_on_invalid_category_id() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let category_id = Some(42);

        let result = create_transaction(
            Transaction::build(123.45, date!(2025 - 10 - 04), "", user.id).category_id(category_id),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(category_id)));
    }

    #[test]
    fn create_fails_on_category_of_other_user() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let other_user = insert_test_user("other@bar.baz", &conn);
        let category = insert_category(&other_user, &conn);

        let result = create_transaction(
            Transaction::build(123.45, date!(2025 - 10 - 04), "", user.id)
                .category_id(Some(category.id)),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(category.id))));
    }

    #[test]
    fn get_transaction_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = get_transaction(1337, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_transactions_by_user_returns_own_transactions_in_date_order() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let other_user = insert_test_user("other@bar.baz", &conn);
        let later = create_transaction(
            Transaction::build(2.0, date!(2025 - 10 - 06), "later", user.id),
            &conn,
        )
        .unwrap();
        let earlier = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 01), "earlier", user.id),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(3.0, date!(2025 - 10 - 03), "not mine", other_user.id),
            &conn,
        )
        .unwrap();

        let got = get_transactions_by_user(user.id, &conn).unwrap();

        assert_eq!(got, vec![earlier, later]);
    }

    #[test]
    fn set_category_succeeds() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let category = insert_category(&user, &conn);
        let transaction = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "", user.id),
            &conn,
        )
        .unwrap();

        set_transaction_category(transaction.id, Some(category.id), &conn).unwrap();

        let got = get_transaction(transaction.id, &conn).unwrap();
        assert_eq!(got.category_id, Some(category.id));
        assert_eq!(get_transaction_category(&got, &conn), Ok(Some(category)));
    }

    #[test]
    fn set_category_to_none_clears_category() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let category = insert_category(&user, &conn);
        let transaction = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "", user.id)
                .category_id(Some(category.id)),
            &conn,
        )
        .unwrap();

        set_transaction_category(transaction.id, None, &conn).unwrap();

        assert_eq!(get_transaction(transaction.id, &conn).unwrap().category_id, None);
    }

    #[test]
    fn set_category_on_missing_transaction_fails() {
        let conn = get_test_connection();

        let result = set_transaction_category(999, None, &conn);

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn delete_succeeds() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let transaction = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "", user.id),
            &conn,
        )
        .unwrap();

        delete_transaction(transaction.id, &conn).unwrap();

        assert_eq!(get_transaction(transaction.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_transaction_fails() {
        let conn = get_test_connection();

        let result = delete_transaction(999, &conn);

        assert_eq!(result, Err(Error::DeleteMissingTransaction));
    }

    #[test]
    fn deleting_category_leaves_transaction_with_dangling_id() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let category = insert_category(&user, &conn);
        let transaction = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 05), "", user.id)
                .category_id(Some(category.id)),
            &conn,
        )
        .unwrap();

        delete_category(category.id, &conn).expect("Could not delete category");

        let got = get_transaction(transaction.id, &conn).expect("Transaction should remain");
        assert_eq!(got.category_id, Some(category.id));
        assert_eq!(get_transaction_category(&got, &conn), Ok(None));
    }

    #[test]
    fn deleting_user_keeps_transactions_and_removes_categories() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let category = insert_category(&user, &conn);
        let transaction = create_transaction(
            Transaction::build(-20.0, date!(2025 - 10 - 05), "Groceries", user.id)
                .category_id(Some(category.id)),
            &conn,
        )
        .unwrap();

        delete_user(user.id, &conn).expect("Could not delete user");

        assert_eq!(get_categories_by_user(user.id, &conn), Ok(vec![]));
        let got = get_transaction(transaction.id, &conn).expect("Transaction should remain");
        assert_eq!(got, transaction);
        assert_eq!(get_transaction_category(&got, &conn), Ok(None));
    }

    #[test]
    fn get_count() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);
        let today = date!(2025 - 10 - 05);
        let want_count = 20;
        for i in 1..=want_count {
            create_transaction(Transaction::build(i as f64, today, "", user.id), &conn)
                .expect("Could not create transaction");
        }

        let got_count = count_transactions(&conn).expect("Could not get count");

        assert_eq!(want_count, got_count);
    }
}
