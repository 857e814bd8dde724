use std::{error::Error, path::PathBuf, process::exit};

use clap::Parser;

use budget_backend::{
    db,
    logging::setup_logging,
    migration::{self, MigrationReport},
};

/// A utility for bringing the schema of a budget database up to date.
///
/// Run this once per deployment, before the application starts serving
/// requests.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. Created if missing.
    #[arg(long)]
    db_path: PathBuf,

    /// Only apply migrations up to and including this migration ID.
    #[arg(long)]
    target: Option<String>,

    /// List the known migrations and whether they have been applied instead
    /// of migrating.
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Also append debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(args.log_file.as_deref())?;

    if args.list && !args.db_path.is_file() {
        eprintln!("File does not exist at {:#?}!", args.db_path);
        exit(1);
    }

    let connection = db::open(&args.db_path)?;

    if args.list {
        for status in migration::migration_status(&connection)? {
            match status.applied_at {
                Some(applied_at) => println!("[X] {} (applied {applied_at})", status.id),
                None => println!("[ ] {}", status.id),
            }
        }

        return Ok(());
    }

    let report = match &args.target {
        Some(target) => migration::migrate_to(target, &connection),
        None => migration::migrate(&connection),
    };

    match report {
        Ok(report) => print_report(&report),
        Err(error) => {
            eprintln!("Migration failed, no changes were made: {error}");
            exit(1);
        }
    }

    Ok(())
}

fn print_report(report: &MigrationReport) {
    if report.applied.is_empty() {
        println!("No migrations to apply.");
        return;
    }

    for id in &report.applied {
        println!("Applied {id}");
    }
}
