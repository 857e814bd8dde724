//! Versioned, ordered schema migrations.
//!
//! Each [Migration] is a list of [Operation]s identified by a unique ID. The
//! IDs of applied migrations are recorded in the `schema_migration` table, so
//! running the migrations again only applies the ones that are missing.
//!
//! A run holds an exclusive lock on the database from before it reads the
//! version table until it commits. Two processes migrating the same database
//! are therefore serialized: the second waits for the first (up to the busy
//! timeout), then finds nothing left to do. A failing run is rolled back as a
//! whole.

mod history;
mod operation;

use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{Error, db::table_exists};

pub use history::MIGRATIONS;
pub use operation::{Index, Operation};

/// A named, forward-only change to the database schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    /// The unique ID recorded in the version table once applied.
    pub id: &'static str,
    /// The IDs of the migrations that must be applied first.
    pub dependencies: &'static [&'static str],
    /// The changes to apply, in order.
    pub operations: &'static [Operation],
}

/// The outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// IDs of the migrations applied by this run, in order.
    pub applied: Vec<&'static str>,
    /// How many of the considered migrations had already been applied.
    pub already_applied: usize,
}

/// Whether a migration has been applied, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// The migration ID.
    pub id: &'static str,
    /// When the migration was applied, or `None` if it is pending.
    pub applied_at: Option<OffsetDateTime>,
}

/// Apply every pending migration.
///
/// Running this on an up to date database is a no-op.
///
/// # Errors
/// Returns an error, and applies nothing, if any migration fails.
pub fn migrate(connection: &Connection) -> Result<MigrationReport, Error> {
    run_pending(MIGRATIONS, None, connection)
}

/// Apply the pending migrations up to and including `target`.
///
/// # Errors
/// Returns [Error::UnknownMigration] if `target` is not a registered
/// migration, or the error of the first migration that fails.
pub fn migrate_to(target: &str, connection: &Connection) -> Result<MigrationReport, Error> {
    run_pending(MIGRATIONS, Some(target), connection)
}

/// Apply exactly one migration.
///
/// # Errors
/// Returns:
/// - [Error::UnknownMigration] if `id` is not a registered migration,
/// - [Error::AlreadyApplied] if the migration has been applied,
/// - [Error::MissingDependency] if one of its dependencies has not been applied,
/// - [Error::SchemaConflict] if the schema does not match what the migration expects.
pub fn apply(id: &str, connection: &Connection) -> Result<(), Error> {
    apply_one(MIGRATIONS, id, connection)
}

/// List every registered migration along with when it was applied.
///
/// # Errors
/// Returns an error if the version table could not be read.
pub fn migration_status(connection: &Connection) -> Result<Vec<MigrationStatus>, Error> {
    let mut applied = if table_exists(VERSION_TABLE, connection)? {
        connection
            .prepare("SELECT id, applied_at FROM schema_migration")?
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, OffsetDateTime>, rusqlite::Error>>()?
    } else {
        HashMap::new()
    };

    Ok(MIGRATIONS
        .iter()
        .map(|migration| MigrationStatus {
            id: migration.id,
            applied_at: applied.remove(migration.id),
        })
        .collect())
}

/// The IDs of the applied migrations, in the order they were applied.
///
/// # Errors
/// Returns an error if the version table could not be read.
pub fn applied_migrations(connection: &Connection) -> Result<Vec<String>, Error> {
    if !table_exists(VERSION_TABLE, connection)? {
        return Ok(Vec::new());
    }

    connection
        .prepare("SELECT id FROM schema_migration ORDER BY rowid")?
        .query_map([], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

const VERSION_TABLE: &str = "schema_migration";

fn run_pending(
    migrations: &[Migration],
    target: Option<&str>,
    connection: &Connection,
) -> Result<MigrationReport, Error> {
    let end = match target {
        Some(target) => {
            migrations
                .iter()
                .position(|migration| migration.id == target)
                .ok_or_else(|| Error::UnknownMigration(target.to_owned()))?
                + 1
        }
        None => migrations.len(),
    };

    let transaction = lock(connection)?;
    let applied = read_applied(&transaction)?;

    let mut report = MigrationReport {
        applied: Vec::new(),
        already_applied: 0,
    };

    for migration in &migrations[..end] {
        if applied.contains(migration.id) {
            report.already_applied += 1;
            continue;
        }

        check_dependencies(migration, &applied, &report.applied)?;
        apply_operations(migration, &transaction)?;
        report.applied.push(migration.id);
    }

    transaction.commit()?;

    if report.applied.is_empty() {
        tracing::info!(
            "Database schema is up to date ({} migrations applied).",
            report.already_applied
        );
    } else {
        tracing::info!(
            "Applied {} migration(s), {} already applied.",
            report.applied.len(),
            report.already_applied
        );
    }

    Ok(report)
}

fn apply_one(migrations: &[Migration], id: &str, connection: &Connection) -> Result<(), Error> {
    let migration = migrations
        .iter()
        .find(|migration| migration.id == id)
        .ok_or_else(|| Error::UnknownMigration(id.to_owned()))?;

    let transaction = lock(connection)?;
    let applied = read_applied(&transaction)?;

    if applied.contains(migration.id) {
        return Err(Error::AlreadyApplied(migration.id.to_owned()));
    }

    check_dependencies(migration, &applied, &[])?;
    apply_operations(migration, &transaction)?;
    transaction.commit()?;

    Ok(())
}

/// Take the migration lock and make sure the version table exists.
fn lock(connection: &Connection) -> Result<SqlTransaction<'_>, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    transaction.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migration (
            id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    Ok(transaction)
}

fn read_applied(connection: &Connection) -> Result<HashSet<String>, Error> {
    connection
        .prepare("SELECT id FROM schema_migration")?
        .query_map([], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

fn check_dependencies(
    migration: &Migration,
    applied: &HashSet<String>,
    applied_this_run: &[&str],
) -> Result<(), Error> {
    for dependency in migration.dependencies {
        if !applied.contains(*dependency) && !applied_this_run.contains(dependency) {
            return Err(Error::MissingDependency {
                migration: migration.id.to_owned(),
                dependency: (*dependency).to_owned(),
            });
        }
    }

    Ok(())
}

fn apply_operations(migration: &Migration, connection: &Connection) -> Result<(), Error> {
    tracing::info!("Applying migration {}", migration.id);

    for operation in migration.operations {
        operation.apply(connection).inspect_err(|error| {
            tracing::error!("Migration {} failed at \"{operation}\": {error}", migration.id);
        })?;
    }

    connection.execute(
        "INSERT INTO schema_migration (id, applied_at) VALUES (?1, ?2)",
        (migration.id, OffsetDateTime::now_utc()),
    )?;

    Ok(())
}
