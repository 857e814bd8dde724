//! The schema changes a migration is made of.

use std::fmt::Display;

use rusqlite::Connection;

use crate::{
    Error,
    db::{column_exists, schema_object_exists, table_exists},
};

/// An index created alongside a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    /// The name of the index.
    pub name: &'static str,
    /// The comma separated indexed columns.
    pub columns: &'static str,
}

/// A single change to the database schema.
///
/// Every operation checks the current schema before touching it and fails
/// with [Error::SchemaConflict] rather than guessing when the schema is not in
/// the expected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create a new table and its indexes.
    CreateTable {
        /// The table name.
        table: &'static str,
        /// Column and constraint definitions, without the outer parentheses.
        definition: &'static str,
        /// Indexes to create on the new table.
        indexes: &'static [Index],
    },
    /// Add a column to an existing table.
    ///
    /// Existing rows receive the column default.
    AddColumn {
        /// The table name.
        table: &'static str,
        /// The new column's name.
        column: &'static str,
        /// The column type, constraints and default.
        definition: &'static str,
    },
    /// Create an index on an existing table.
    CreateIndex {
        /// The table name.
        table: &'static str,
        /// The index definition.
        index: Index,
        /// Whether the index enforces uniqueness.
        unique: bool,
    },
    /// Recreate a table with a new definition and copy its rows across.
    ///
    /// SQLite cannot alter the constraints of an existing column, so changing
    /// e.g. a foreign key's delete behaviour means rebuilding the table.
    RebuildTable {
        /// The table name.
        table: &'static str,
        /// The new column and constraint definitions.
        definition: &'static str,
        /// The columns copied from the old table. All of them must exist in
        /// both the old and new definitions.
        columns: &'static [&'static str],
        /// Indexes to create on the rebuilt table.
        indexes: &'static [Index],
    },
}

impl Operation {
    /// Apply the operation.
    ///
    /// The caller is expected to run this inside a transaction so that a
    /// failing operation leaves no partial changes behind.
    ///
    /// # Errors
    /// Returns [Error::SchemaConflict] if the schema is not in the state the
    /// operation expects, or [Error::SqlError] for any other SQL error.
    pub fn apply(&self, connection: &Connection) -> Result<(), Error> {
        tracing::debug!("{self}");

        match *self {
            Operation::CreateTable {
                table,
                definition,
                indexes,
            } => {
                if table_exists(table, connection)? {
                    return Err(Error::SchemaConflict(format!(
                        "the table \"{table}\" already exists"
                    )));
                }

                connection.execute_batch(&format!("CREATE TABLE \"{table}\" ({definition});"))?;
                create_indexes(table, indexes, connection)
            }
            Operation::AddColumn {
                table,
                column,
                definition,
            } => {
                if !table_exists(table, connection)? {
                    return Err(Error::SchemaConflict(format!(
                        "cannot add \"{column}\" to the missing table \"{table}\""
                    )));
                }

                if column_exists(table, column, connection)? {
                    return Err(Error::SchemaConflict(format!(
                        "the column \"{table}.{column}\" already exists"
                    )));
                }

                connection.execute_batch(&format!(
                    "ALTER TABLE \"{table}\" ADD COLUMN \"{column}\" {definition};"
                ))?;

                Ok(())
            }
            Operation::CreateIndex {
                table,
                index,
                unique,
            } => {
                if !table_exists(table, connection)? {
                    return Err(Error::SchemaConflict(format!(
                        "cannot index the missing table \"{table}\""
                    )));
                }

                create_index(table, index, unique, connection)
            }
            Operation::RebuildTable {
                table,
                definition,
                columns,
                indexes,
            } => {
                if !table_exists(table, connection)? {
                    return Err(Error::SchemaConflict(format!(
                        "cannot rebuild the missing table \"{table}\""
                    )));
                }

                for column in columns {
                    if !column_exists(table, column, connection)? {
                        return Err(Error::SchemaConflict(format!(
                            "cannot copy the missing column \"{table}.{column}\""
                        )));
                    }
                }

                let staging_table = format!("{table}__new");

                if table_exists(&staging_table, connection)? {
                    return Err(Error::SchemaConflict(format!(
                        "the staging table \"{staging_table}\" already exists"
                    )));
                }

                let column_list = columns
                    .iter()
                    .map(|column| format!("\"{column}\""))
                    .collect::<Vec<_>>()
                    .join(", ");

                connection.execute_batch(&format!(
                    "CREATE TABLE \"{staging_table}\" ({definition});
                     INSERT INTO \"{staging_table}\" ({column_list}) SELECT {column_list} FROM \"{table}\";
                     DROP TABLE \"{table}\";
                     ALTER TABLE \"{staging_table}\" RENAME TO \"{table}\";"
                ))?;

                create_indexes(table, indexes, connection)
            }
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::CreateTable { table, .. } => write!(f, "Create table {table}"),
            Operation::AddColumn { table, column, .. } => {
                write!(f, "Add column {column} to {table}")
            }
            Operation::CreateIndex { table, index, .. } => {
                write!(f, "Create index {} on {table}", index.name)
            }
            Operation::RebuildTable { table, .. } => write!(f, "Rebuild table {table}"),
        }
    }
}

fn create_indexes(table: &str, indexes: &[Index], connection: &Connection) -> Result<(), Error> {
    for index in indexes {
        create_index(table, *index, false, connection)?;
    }

    Ok(())
}

fn create_index(
    table: &str,
    index: Index,
    unique: bool,
    connection: &Connection,
) -> Result<(), Error> {
    if schema_object_exists(index.name, "index", connection)? {
        return Err(Error::SchemaConflict(format!(
            "the index \"{}\" already exists",
            index.name
        )));
    }

    let unique = if unique { "UNIQUE " } else { "" };

    connection.execute_batch(&format!(
        "CREATE {unique}INDEX \"{}\" ON \"{table}\" ({});",
        index.name, index.columns
    ))?;

    Ok(())
}
