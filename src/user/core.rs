//! Defines the user model and the database queries for users.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

// ============================================================================
// MODELS
// ============================================================================

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// `User` deliberately does not implement `Serialize`: the only external
/// representation is the one produced by [crate::user::serialize].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's given name, may be empty.
    pub first_name: String,
    /// The user's family name, may be empty.
    pub last_name: String,
    /// The user's email address, unique across users.
    pub email: EmailAddress,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's ID at the external identity provider, if linked.
    pub clerk_id: Option<String>,
}

/// The details needed to register a new user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    /// The user's given name, may be empty.
    pub first_name: String,
    /// The user's family name, may be empty.
    pub last_name: String,
    /// The user's email address.
    pub email: EmailAddress,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a [Error::DuplicateEmail] if the email is already in use, or
/// [Error::SqlError] if another SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "INSERT INTO user (first_name, last_name, email, password)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, first_name, last_name, email, password, clerk_id",
        )?
        .query_row(
            (
                &new_user.first_name,
                &new_user.last_name,
                new_user.email.as_str(),
                new_user.password_hash.as_ref(),
            ),
            map_user_row,
        )?;

    tracing::debug!("Created user {}", user.id);

    Ok(user)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, first_name, last_name, email, password, clerk_id FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database that has the specified `email` address.
///
/// # Errors
///
/// Returns a [Error::NotFound] error if there is no user with the specified email or
/// [Error::SqlError] if there are SQL related errors.
pub fn get_user_by_email(email: &EmailAddress, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, first_name, last_name, email, password, clerk_id FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", email.as_str())], map_user_row)
        .map_err(|error| error.into())
}

/// Overwrite the stored names, email and password hash of `user`.
///
/// The user's ID and `clerk_id` are never changed by this function.
///
/// # Errors
///
/// Returns:
/// - [Error::UpdateMissingUser] if no user has the ID `user.id`,
/// - [Error::DuplicateEmail] if another user has the same email,
/// - [Error::SqlError] if there is some other SQL error.
pub fn update_user(user: &User, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET first_name = ?1, last_name = ?2, email = ?3, password = ?4 WHERE id = ?5",
        (
            &user.first_name,
            &user.last_name,
            user.email.as_str(),
            user.password_hash.as_ref(),
            user.id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Link the user to an ID at the external identity provider, or unlink it
/// with `None`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if the user does not exist, or
/// [Error::SqlError] if the ID is already linked to another user or there is
/// some other SQL error.
pub fn set_clerk_id(
    user_id: UserID,
    clerk_id: Option<&str>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET clerk_id = ?1 WHERE id = ?2",
        (clerk_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Delete a user.
///
/// The user's categories are deleted with them. Their transactions are kept,
/// along with any (now dangling) category references.
///
/// # Errors
///
/// Returns [Error::DeleteMissingUser] if the user does not exist, or
/// [Error::SqlError] if there is some other SQL error.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [user_id.as_i64()])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingUser);
    }

    tracing::info!("Deleted user {user_id}");

    Ok(())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_id = row.get(0)?;
    let first_name = row.get(1)?;
    let last_name = row.get(2)?;
    let raw_email: String = row.get(3)?;
    let raw_password_hash: String = row.get(4)?;
    let clerk_id = row.get(5)?;

    Ok(User {
        id: UserID::new(raw_id),
        first_name,
        last_name,
        email: EmailAddress::new_unchecked(raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        clerk_id,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod user_tests {
    use std::str::FromStr;

    use email_address::EmailAddress;

    use crate::{Error, PasswordHash};

    use super::{
        UserID, count_users, create_user, delete_user, get_user_by_email, get_user_by_id,
        set_clerk_id,
        test_utils::{get_test_connection, insert_test_user, new_user},
        update_user,
    };

    #[test]
    fn insert_user_succeeds() {
        let conn = get_test_connection();
        let want = new_user("hello@world.com");

        let inserted_user = create_user(want.clone(), &conn).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.first_name, want.first_name);
        assert_eq!(inserted_user.last_name, want.last_name);
        assert_eq!(inserted_user.email, want.email);
        assert_eq!(inserted_user.password_hash, want.password_hash);
        assert_eq!(inserted_user.clerk_id, None);
    }

    #[test]
    fn insert_user_fails_on_duplicate_email() {
        let conn = get_test_connection();
        insert_test_user("hello@world.com", &conn);

        let result = create_user(new_user("hello@world.com"), &conn);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let conn = get_test_connection();

        assert_eq!(get_user_by_id(UserID::new(42), &conn), Err(Error::NotFound));
    }

    #[test]
    fn get_user_succeeds_with_existing_id() {
        let conn = get_test_connection();
        let test_user = insert_test_user("foo@bar.baz", &conn);

        let retrieved_user = get_user_by_id(test_user.id, &conn).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn get_user_by_email_succeeds() {
        let conn = get_test_connection();
        let test_user = insert_test_user("foo@bar.baz", &conn);

        let retrieved_user = get_user_by_email(&test_user.email, &conn).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn update_user_overwrites_fields() {
        let conn = get_test_connection();
        let mut user = insert_test_user("foo@bar.baz", &conn);
        user.first_name = "Grace".to_owned();
        user.last_name = "Hopper".to_owned();
        user.email = EmailAddress::from_str("grace@navy.mil").unwrap();
        user.password_hash = PasswordHash::new_unchecked("hunter3");

        update_user(&user, &conn).unwrap();

        assert_eq!(get_user_by_id(user.id, &conn).unwrap(), user);
    }

    #[test]
    fn update_user_keeps_clerk_id() {
        let conn = get_test_connection();
        let mut user = insert_test_user("foo@bar.baz", &conn);
        set_clerk_id(user.id, Some("user_2abc"), &conn).unwrap();
        user.first_name = "Grace".to_owned();

        update_user(&user, &conn).unwrap();

        let stored_user = get_user_by_id(user.id, &conn).unwrap();
        assert_eq!(stored_user.first_name, "Grace");
        assert_eq!(stored_user.clerk_id.as_deref(), Some("user_2abc"));
    }

    #[test]
    fn update_user_fails_on_duplicate_email() {
        let conn = get_test_connection();
        let first = insert_test_user("first@bar.baz", &conn);
        let mut second = insert_test_user("second@bar.baz", &conn);
        second.email = first.email;

        assert_eq!(update_user(&second, &conn), Err(Error::DuplicateEmail));
    }

    #[test]
    fn update_missing_user_fails() {
        let conn = get_test_connection();
        let mut user = insert_test_user("foo@bar.baz", &conn);
        user.id = UserID::new(user.id.as_i64() + 1);

        assert_eq!(update_user(&user, &conn), Err(Error::UpdateMissingUser));
    }

    #[test]
    fn clerk_id_must_be_unique() {
        let conn = get_test_connection();
        let first = insert_test_user("first@bar.baz", &conn);
        let second = insert_test_user("second@bar.baz", &conn);
        set_clerk_id(first.id, Some("user_2abc"), &conn).unwrap();

        let result = set_clerk_id(second.id, Some("user_2abc"), &conn);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn delete_user_succeeds() {
        let conn = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &conn);

        delete_user(user.id, &conn).unwrap();

        assert_eq!(get_user_by_id(user.id, &conn), Err(Error::NotFound));
        assert_eq!(delete_user(user.id, &conn), Err(Error::DeleteMissingUser));
    }

    #[test]
    fn returns_correct_count() {
        let conn = get_test_connection();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(0, count, "Want zero users before insertion, got {count}");

        insert_test_user("foo@bar.baz", &conn);

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(1, count, "Want one user after insertion, got {count}");
    }
}
