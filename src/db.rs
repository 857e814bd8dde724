/*! Connection setup and schema introspection helpers for the application's SQLite database. */

use std::{path::Path, time::Duration};

use rusqlite::{Connection, OptionalExtension};

use crate::{Error, migration::migrate};

/// How long a connection waits for another connection's lock (e.g. a
/// migration running in another process) before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Open the database at `path` and configure the connection.
///
/// # Errors
/// Returns an error if the file cannot be opened or configured.
pub fn open(path: impl AsRef<Path>) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    configure_connection(&connection)?;

    Ok(connection)
}

/// Enable foreign key enforcement and set the busy timeout.
///
/// SQLite only honours `ON DELETE CASCADE` when foreign keys are enabled, and
/// the setting is per connection, so every connection must go through here.
///
/// # Errors
/// Returns an error if the pragmas could not be set.
pub fn configure_connection(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;

    Ok(())
}

/// Configure the connection and bring the schema up to date by applying all
/// pending migrations.
///
/// # Errors
/// Returns an error if the connection could not be configured or a migration
/// failed.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    configure_connection(connection)?;
    migrate(connection)?;

    Ok(())
}

/// Whether a table or index called `name` exists.
pub(crate) fn schema_object_exists(
    name: &str,
    object_type: &str,
    connection: &Connection,
) -> Result<bool, rusqlite::Error> {
    connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2",
            (object_type, name),
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
}

/// Whether `table` exists.
pub(crate) fn table_exists(table: &str, connection: &Connection) -> Result<bool, rusqlite::Error> {
    schema_object_exists(table, "table", connection)
}

/// Whether `table` has a column called `column`.
pub(crate) fn column_exists(
    table: &str,
    column: &str,
    connection: &Connection,
) -> Result<bool, rusqlite::Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            (table, column),
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
}

/// A foreign key declared on a table, as reported by `PRAGMA foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// The column holding the reference.
    pub from: String,
    /// The referenced table.
    pub table: String,
    /// The `ON DELETE` action, e.g. `CASCADE` or `NO ACTION`.
    pub on_delete: String,
}

/// List the foreign keys declared on `table`.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn foreign_keys(table: &str, connection: &Connection) -> Result<Vec<ForeignKey>, Error> {
    connection
        .prepare("SELECT \"from\", \"table\", on_delete FROM pragma_foreign_key_list(?1)")?
        .query_map([table], |row| {
            Ok(ForeignKey {
                from: row.get(0)?,
                table: row.get(1)?,
                on_delete: row.get(2)?,
            })
        })?
        .map(|maybe_key| maybe_key.map_err(Error::from))
        .collect()
}
