//! The external (JSON) representation of a user.
//!
//! The representation is restricted to a fixed allow-list of fields,
//! [USER_FIELDS]. The `password` field only ever carries a bcrypt hash on the
//! way out: raw passwords received on the way in are checked for strength and
//! hashed before they reach a [User].

use std::str::FromStr;

use email_address::EmailAddress;
use rusqlite::Connection;
use serde_json::{Map, Value, json};

use crate::{Error, PasswordHash};

use super::core::{User, UserID, get_user_by_id, update_user};

/// The fields of the user representation, in display order.
pub const USER_FIELDS: [&str; 5] = ["id", "first_name", "last_name", "email", "password"];

const MAX_NAME_LENGTH: usize = 150;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Convert a user to its external representation.
///
/// The result is a JSON object with exactly the keys in [USER_FIELDS], with
/// values copied from `user`. `password` is the stored password hash.
pub fn serialize(user: &User) -> Value {
    json!({
        "id": user.id.as_i64(),
        "first_name": user.first_name,
        "last_name": user.last_name,
        "email": user.email.as_str(),
        "password": user.password_hash.as_ref(),
    })
}

/// Build a user from its external representation.
///
/// Every field in [USER_FIELDS] is required and no other field is accepted.
/// A `password` that is already a bcrypt hash, as produced by [serialize], is
/// kept as is, so `serialize(&deserialize(&x, cost)?) == x`. Any other
/// password is treated as a new raw password: it must be strong enough and is
/// hashed with `password_cost`.
///
/// The returned user has no `clerk_id`, the field cannot be set through this
/// representation.
///
/// # Errors
///
/// Returns a validation error ([Error::is_validation]) if `input` is not an
/// object, has a missing, mistyped or unknown field, or a field value fails
/// validation. Returns [Error::HashingError] if a raw password could not be
/// hashed.
pub fn deserialize(input: &Value, password_cost: u32) -> Result<User, Error> {
    let object = input.as_object().ok_or_else(|| Error::InvalidField {
        field: "user".to_owned(),
        reason: "expected a JSON object".to_owned(),
    })?;

    if let Some(unexpected) = object
        .keys()
        .find(|key| !USER_FIELDS.contains(&key.as_str()))
    {
        return Err(Error::UnexpectedField(unexpected.to_owned()));
    }

    let id = required_field(object, "id")?
        .as_i64()
        .filter(|id| *id > 0)
        .ok_or_else(|| invalid_field("id", "expected a positive integer"))?;

    let first_name = bounded_string(object, "first_name", MAX_NAME_LENGTH)?;
    let last_name = bounded_string(object, "last_name", MAX_NAME_LENGTH)?;

    let raw_email = bounded_string(object, "email", MAX_EMAIL_LENGTH)?;
    let email =
        EmailAddress::from_str(raw_email).map_err(|error| Error::InvalidEmail(error.to_string()))?;

    let raw_password = bounded_string(object, "password", MAX_PASSWORD_LENGTH)?;
    if raw_password.is_empty() {
        return Err(invalid_field("password", "cannot be empty"));
    }

    let password_hash = match PasswordHash::parse(raw_password) {
        Some(password_hash) => password_hash,
        None => PasswordHash::from_raw_password(raw_password, password_cost)?,
    };

    Ok(User {
        id: UserID::new(id),
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        email,
        password_hash,
        clerk_id: None,
    })
}

/// Apply an incoming user representation on behalf of `acting_user` and
/// return the stored result.
///
/// A user may only update their own record. Attempts to update someone else
/// are reported as [Error::NotFound] so that callers cannot probe which user
/// IDs exist.
///
/// A `password` shaped like a bcrypt hash is only accepted if it is the hash
/// already stored for the user, i.e. the password is unchanged. New passwords
/// must be sent raw so that their strength can be checked.
///
/// # Errors
///
/// Returns the validation errors of [deserialize], [Error::InvalidField] if
/// `password` is a hash other than the stored one, [Error::NotFound] if the
/// representation is for another user, [Error::DuplicateEmail] if the email
/// belongs to another user, or [Error::SqlError] for other SQL errors.
pub fn update_user_from_json(
    acting_user: UserID,
    input: &Value,
    password_cost: u32,
    connection: &Connection,
) -> Result<User, Error> {
    let user = deserialize(input, password_cost)?;

    if user.id != acting_user {
        tracing::warn!(
            "User {acting_user} tried to update the record of user {}",
            user.id
        );
        return Err(Error::NotFound);
    }

    let stored_user = get_user_by_id(user.id, connection)?;
    let raw_password = input["password"].as_str().unwrap_or_default();
    if PasswordHash::parse(raw_password).is_some()
        && raw_password != stored_user.password_hash.as_ref()
    {
        tracing::warn!("User {acting_user} tried to set a password hash directly");
        return Err(invalid_field(
            "password",
            "expected the current password hash or a new raw password",
        ));
    }

    update_user(&user, connection).map_err(|error| match error {
        Error::UpdateMissingUser => Error::NotFound,
        error => error,
    })?;

    get_user_by_id(user.id, connection)
}

fn required_field<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a Value, Error> {
    object
        .get(field)
        .ok_or_else(|| Error::MissingField(field.to_owned()))
}

fn bounded_string<'a>(
    object: &'a Map<String, Value>,
    field: &str,
    max_length: usize,
) -> Result<&'a str, Error> {
    let string = required_field(object, field)?
        .as_str()
        .ok_or_else(|| invalid_field(field, "expected a string"))?;

    if string.chars().count() > max_length {
        return Err(invalid_field(
            field,
            &format!("cannot be longer than {max_length} characters"),
        ));
    }

    Ok(string)
}

fn invalid_field(field: &str, reason: &str) -> Error {
    Error::InvalidField {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}
