//! Defines the crate level error type and the conversion from SQLite errors.

use crate::database_id::CategoryId;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required field was missing from an input mapping.
    #[error("the field \"{0}\" is required")]
    MissingField(String),

    /// A field in an input mapping had the wrong type or an invalid value.
    #[error("the field \"{field}\" is invalid: {reason}")]
    InvalidField {
        /// The name of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An input mapping contained a field that is not in the allow-list.
    #[error("the field \"{0}\" is not allowed")]
    UnexpectedField(String),

    /// The email address could not be parsed.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with a client this error should be replaced with a
    /// general error indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An empty string was used to create a category title.
    #[error("category title cannot be empty")]
    EmptyCategoryTitle,

    /// A category title was longer than the column allows.
    #[error("category title cannot be longer than {0} characters")]
    CategoryTitleTooLong(usize),

    /// The monthly budget could not be represented as a decimal with at most
    /// ten digits, two of them after the decimal point.
    #[error("invalid monthly budget: {0}")]
    InvalidMonthlyBudget(String),

    /// The colour was not a hex colour code such as `#1a2b3c`.
    #[error("invalid color \"{0}\", expected a hex color code like #1a2b3c")]
    InvalidColor(String),

    /// The currency was empty or too long.
    #[error("invalid currency \"{0}\"")]
    InvalidCurrency(String),

    /// The location was empty or too long.
    #[error("invalid location \"{0}\"")]
    InvalidLocation(String),

    /// The category used for a transaction does not exist or belongs to
    /// another user.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// The user's email already exists in the database.
    ///
    /// The client should try again with a different email address.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// A query was given an invalid foreign key.
    #[error("a referenced row does not exist")]
    InvalidForeignKey,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a user that does not exist
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,

    /// Tried to delete a user that does not exist
    #[error("tried to delete a user that is not in the database")]
    DeleteMissingUser,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// A migration was applied before one of the migrations it depends on.
    ///
    /// This requires operator intervention: apply the dependency first.
    #[error("migration \"{migration}\" depends on \"{dependency}\", which has not been applied")]
    MissingDependency {
        /// The migration that was requested.
        migration: String,
        /// The dependency that has not been applied yet.
        dependency: String,
    },

    /// The migration has already been recorded in the version table.
    #[error("migration \"{0}\" has already been applied")]
    AlreadyApplied(String),

    /// No migration with the given ID is registered.
    #[error("there is no migration named \"{0}\"")]
    UnknownMigration(String),

    /// The database schema does not match what a migration expects, e.g. a
    /// column it adds already exists.
    ///
    /// This requires operator intervention to resolve the schema drift.
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl Error {
    /// Whether the error was caused by invalid client input, as opposed to
    /// a storage or programming error.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_)
                | Error::InvalidField { .. }
                | Error::UnexpectedField(_)
                | Error::InvalidEmail(_)
                | Error::TooWeak(_)
                | Error::EmptyCategoryTitle
                | Error::CategoryTitleTooLong(_)
                | Error::InvalidMonthlyBudget(_)
                | Error::InvalidColor(_)
                | Error::InvalidCurrency(_)
                | Error::InvalidLocation(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::InvalidForeignKey
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
