//! The ordered list of migrations that builds the application schema.
//!
//! Migrations are append-only: once released, a migration must never be
//! edited, only followed by a new one.

use super::{Index, Migration, Operation};

/// Every migration, in the order it must be applied.
pub const MIGRATIONS: &[Migration] = &[
    INITIAL,
    USER_CLERK_ID,
    TRANSACTION_CURRENCY_LOCATION_AND_CATEGORY,
];

const INITIAL: Migration = Migration {
    id: "0001_initial",
    dependencies: &[],
    operations: &[
        Operation::CreateTable {
            table: "user",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                email VARCHAR(254) NOT NULL UNIQUE,
                password VARCHAR(128) NOT NULL",
            indexes: &[],
        },
        // category_id has no foreign key: the category table does not exist
        // until 0003, and SQLite refuses writes to a child of a missing table.
        Operation::CreateTable {
            table: "transaction",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                category_id INTEGER,
                user_id INTEGER NOT NULL",
            indexes: &[Index {
                name: "transaction_user_id_idx",
                columns: "user_id",
            }],
        },
    ],
};

const USER_CLERK_ID: Migration = Migration {
    id: "0002_user_clerk_id",
    dependencies: &["0001_initial"],
    operations: &[
        Operation::AddColumn {
            table: "user",
            column: "clerk_id",
            definition: "VARCHAR(255)",
        },
        Operation::CreateIndex {
            table: "user",
            index: Index {
                name: "user_clerk_id_key",
                columns: "clerk_id",
            },
            unique: true,
        },
    ],
};

const TRANSACTION_CURRENCY_LOCATION_AND_CATEGORY: Migration = Migration {
    id: "0003_transaction_currency_transaction_location_category_and_more",
    dependencies: &["0002_user_clerk_id"],
    operations: &[
        Operation::AddColumn {
            table: "transaction",
            column: "currency",
            definition: "VARCHAR(255) NOT NULL DEFAULT 'USD'",
        },
        Operation::AddColumn {
            table: "transaction",
            column: "location",
            definition: "VARCHAR(255) NOT NULL DEFAULT 'USA'",
        },
        Operation::CreateTable {
            table: "category",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                monthly_budget DECIMAL(10, 2) NOT NULL,
                color VARCHAR(7) NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE",
            indexes: &[Index {
                name: "category_user_id_idx",
                columns: "user_id",
            }],
        },
        // Deleting a category must neither cascade into nor be blocked by
        // transactions, so category_id loses its foreign key and may dangle.
        Operation::RebuildTable {
            table: "transaction",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                category_id INTEGER,
                user_id INTEGER NOT NULL,
                currency VARCHAR(255) NOT NULL DEFAULT 'USD',
                location VARCHAR(255) NOT NULL DEFAULT 'USA'",
            columns: &[
                "id",
                "amount",
                "date",
                "description",
                "category_id",
                "user_id",
                "currency",
                "location",
            ],
            indexes: &[
                Index {
                    name: "transaction_user_id_idx",
                    columns: "user_id",
                },
                Index {
                    name: "transaction_category_id_idx",
                    columns: "category_id",
                },
            ],
        },
    ],
};
