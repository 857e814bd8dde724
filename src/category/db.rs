//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::{Category, CategoryColor, CategoryTitle, NewCategory},
    database_id::CategoryId,
    user::UserID,
};

/// Create a category and return it with its generated ID.
///
/// # Errors
///
/// Returns an [Error::InvalidForeignKey] if `new_category.user_id` does not
/// refer to a user, or [Error::SqlError] for other SQL errors.
pub fn create_category(
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "INSERT INTO category (title, monthly_budget, color, user_id)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, title, monthly_budget, color, user_id",
        )?
        .query_row(
            (
                new_category.title.as_ref(),
                new_category.monthly_budget,
                new_category.color.as_ref(),
                new_category.user_id.as_i64(),
            ),
            map_row,
        )?;

    tracing::debug!(
        "Created category {} for user {}",
        category.id,
        category.user_id
    );

    Ok(category)
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, title, monthly_budget, color, user_id FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve the categories of a user ordered alphabetically by title.
pub fn get_categories_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, title, monthly_budget, color, user_id FROM category
             WHERE user_id = :user_id
             ORDER BY title ASC, id ASC;",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Update the title, budget and colour of a category.
///
/// The owner of a category never changes, `category.user_id` must match the
/// stored owner.
///
/// # Errors
///
/// Returns an [Error::UpdateMissingCategory] if no category with the ID
/// exists for the user.
pub fn update_category(category: &Category, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET title = ?1, monthly_budget = ?2, color = ?3
         WHERE id = ?4 AND user_id = ?5",
        (
            category.title.as_ref(),
            category.monthly_budget,
            category.color.as_ref(),
            category.id,
            category.user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category by ID.
///
/// Transactions in the category are left untouched and keep the now dangling
/// category ID.
///
/// # Errors
///
/// Returns an [Error::DeleteMissingCategory] if the category doesn't exist.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    tracing::debug!("Deleted category {category_id}");

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_title: String = row.get(1)?;
    let monthly_budget = row.get(2)?;
    let raw_color: String = row.get(3)?;
    let user_id = UserID::new(row.get(4)?);

    Ok(Category {
        id,
        title: CategoryTitle::new_unchecked(&raw_title),
        monthly_budget,
        color: CategoryColor::new_unchecked(&raw_color),
        user_id,
    })
}

#[cfg(test)]
mod category_query_tests {
    use std::str::FromStr;

    use rusqlite::Connection;

    use crate::{
        Error,
        category::{
            Category, CategoryColor, CategoryTitle, MonthlyBudget, NewCategory, create_category,
            delete_category, get_categories_by_user, get_category, update_category,
        },
        user::{
            UserID, delete_user,
            test_utils::{get_test_connection, insert_test_user},
        },
    };

    fn new_category(title: &str, budget: &str, user_id: UserID) -> NewCategory {
        NewCategory {
            title: CategoryTitle::new_unchecked(title),
            monthly_budget: MonthlyBudget::from_str(budget).unwrap(),
            color: CategoryColor::new_unchecked("#00ff00"),
            user_id,
        }
    }

    fn insert_category(title: &str, user_id: UserID, connection: &Connection) -> Category {
        create_category(new_category(title, "100", user_id), connection)
            .expect("Could not create test category")
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let want = new_category("Groceries", "250.00", user.id);

        let category =
            create_category(want.clone(), &connection).expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.title, want.title);
        assert_eq!(category.monthly_budget, want.monthly_budget);
        assert_eq!(category.color, want.color);
        assert_eq!(category.user_id, user.id);
    }

    #[test]
    fn create_category_fails_on_missing_user() {
        let connection = get_test_connection();

        let result = create_category(new_category("Groceries", "1", UserID::new(42)), &connection);

        assert_eq!(result, Err(Error::InvalidForeignKey));
    }

    #[test]
    fn monthly_budget_round_trips_with_two_decimal_places() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let category = create_category(new_category("Rent", "1234.5", user.id), &connection)
            .expect("Could not create category");

        let got = get_category(category.id, &connection).expect("Could not get category");

        assert_eq!(got.monthly_budget.to_string(), "1234.50");
        assert_eq!(got.monthly_budget.amount().scale(), 2);
    }

    #[test]
    fn largest_monthly_budget_round_trips() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let category = create_category(new_category("Rent", "99999999.99", user.id), &connection)
            .expect("Could not create category");

        let got = get_category(category.id, &connection).expect("Could not get category");

        assert_eq!(got.monthly_budget.to_string(), "99999999.99");
    }

    #[test]
    fn stored_negative_budget_is_still_readable() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let food = insert_category("Food", user.id, &connection);
        connection
            .execute(
                "INSERT INTO category (title, monthly_budget, color, user_id)
                 VALUES ('Refunds', -5.00, '#ff0000', ?1)",
                [user.id.as_i64()],
            )
            .expect("Could not insert raw category");

        let got = get_categories_by_user(user.id, &connection).expect("Could not get categories");

        assert_eq!(got.len(), 2);
        assert_eq!(got[0], food);
        assert_eq!(got[1].title.as_ref(), "Refunds");
        assert_eq!(got[1].monthly_budget.to_string(), "-5.00");
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();

        let result = get_category(1234, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_categories_by_user_only_returns_own_categories() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let other_user = insert_test_user("other@bar.baz", &connection);
        let want = vec![
            insert_category("Bills", user.id, &connection),
            insert_category("Groceries", user.id, &connection),
        ];
        insert_category("Fun", other_user.id, &connection);

        let got = get_categories_by_user(user.id, &connection).expect("Could not get categories");

        assert_eq!(got, want);
    }

    #[test]
    fn update_category_succeeds() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let mut category = insert_category("Food", user.id, &connection);
        category.title = CategoryTitle::new_unchecked("Eating out");
        category.monthly_budget = MonthlyBudget::from_str("42.1").unwrap();
        category.color = CategoryColor::new_unchecked("#123abc");

        update_category(&category, &connection).expect("Could not update category");

        let got = get_category(category.id, &connection).expect("Could not get category");
        assert_eq!(got, category);
    }

    #[test]
    fn update_category_of_other_user_fails() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let other_user = insert_test_user("other@bar.baz", &connection);
        let mut category = insert_category("Food", user.id, &connection);
        category.user_id = other_user.id;

        let result = update_category(&category, &connection);

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn delete_category_succeeds() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let category = insert_category("Food", user.id, &connection);

        delete_category(category.id, &connection).expect("Could not delete category");

        assert_eq!(get_category(category.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_category_with_invalid_id_fails() {
        let connection = get_test_connection();

        let result = delete_category(999999, &connection);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }

    #[test]
    fn deleting_user_deletes_their_categories() {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let other_user = insert_test_user("other@bar.baz", &connection);
        let category = insert_category("Food", user.id, &connection);
        let other_category = insert_category("Food", other_user.id, &connection);

        delete_user(user.id, &connection).expect("Could not delete user");

        assert_eq!(get_category(category.id, &connection), Err(Error::NotFound));
        assert_eq!(get_category(other_category.id, &connection), Ok(other_category));
    }
}
