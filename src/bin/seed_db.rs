//! Creates a database populated with demo transactions for manual testing
//! of the dashboard queries.

use clap::Parser;
use rusqlite::Connection;
use uuid::Uuid;

use pocketbook::initialize_db;

/// Create a ledger database seeded with demo transactions.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path for the SQLite database to create.
    #[arg(long)]
    db_path: String,
}

fn main() {
    let args = Args::parse();

    let conn = Connection::open(&args.db_path).expect("Could not open the database file.");
    initialize_db(&conn).expect("Could not initialize the database.");

    // Amounts are in cents; dates are milliseconds since the Unix epoch.
    let rows: [(i64, &str, &str, &str, i64); 4] = [
        (8_999, "Shopping", "Amazon Purchase", "expense", 1_732_492_800_000),
        (50_000, "Freelance", "Web Development Project", "income", 1_730_332_800_000),
        (100_000, "Investment", "Stock Market Investment", "income", 1_727_395_200_000),
        (5_000, "Healthcare", "Pharmacy", "expense", 1_726_185_600_000),
    ];

    for (amount, category, description, kind, date) in rows {
        conn.execute(
            "INSERT INTO transactions (id, amount, category, description, type, status, date)
             VALUES (?1, ?2, ?3, ?4, ?5, 'completed', ?6)",
            (
                Uuid::new_v4().to_string(),
                amount,
                category,
                description,
                kind,
                date,
            ),
        )
        .expect("Could not insert seed transaction.");
    }

    println!("Seeded {} transactions into {}", rows.len(), args.db_path);
}
