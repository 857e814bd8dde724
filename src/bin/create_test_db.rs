use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::str::FromStr;

use clap::Parser;
use email_address::EmailAddress;
use time::macros::date;

use budget_backend::{
    PasswordHash, ValidatedPassword,
    category::{CategoryColor, CategoryTitle, MonthlyBudget, NewCategory, create_category},
    db, migration,
    transaction::{Transaction, create_transaction},
    user::{NewUser, create_user},
};

/// A utility for creating a test database for budget_backend.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = db::open(output_path)?;

    migration::migrate(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    let user = create_user(
        NewUser {
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            email: EmailAddress::from_str("test@example.com")?,
            password_hash,
        },
        &conn,
    )?;

    println!("Creating categories...");

    let mut categories = Vec::new();
    for (title, budget, color) in [
        ("Groceries", "450", "#4caf50"),
        ("Rent", "1850.5", "#3f51b5"),
        ("Eating out", "120.25", "#ff9800"),
    ] {
        let category = create_category(
            NewCategory {
                title: CategoryTitle::new(title)?,
                monthly_budget: MonthlyBudget::from_str(budget)?,
                color: CategoryColor::new(color)?,
                user_id: user.id,
            },
            &conn,
        )?;
        categories.push(category);
    }

    println!("Creating transactions...");

    let transactions = [
        Transaction::build(-82.17, date!(2025 - 10 - 01), "Supermarket", user.id)
            .category_id(Some(categories[0].id)),
        Transaction::build(-1850.50, date!(2025 - 10 - 01), "Rent", user.id)
            .category_id(Some(categories[1].id)),
        Transaction::build(-34.00, date!(2025 - 10 - 03), "Ramen", user.id)
            .category_id(Some(categories[2].id))
            .currency("NZD")
            .location("New Zealand"),
        Transaction::build(3200.00, date!(2025 - 10 - 15), "Salary", user.id),
    ];

    for transaction in transactions {
        create_transaction(transaction, &conn)?;
    }

    println!("Success!");

    Ok(())
}
