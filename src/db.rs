/*! Creates the application's database schema. */

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::Error;

/// Create the tables and indexes for the ledger if they do not exist.
///
/// Runs as a single exclusive SQL transaction so a partially created schema
/// is never visible.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                amount INTEGER NOT NULL CHECK (amount > 0),
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'expense', 'refund')),
                status TEXT NOT NULL DEFAULT 'completed'
                    CHECK (status IN ('completed', 'refunded')),
                date INTEGER NOT NULL
                )",
        (),
    )?;

    // Indexes for the listing and aggregation queries.
    transaction.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions (date)",
        (),
    )?;
    transaction.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions (category)",
        (),
    )?;
    transaction.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_type ON transactions (type)",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS category (
                name TEXT PRIMARY KEY
                )",
        (),
    )?;

    transaction.commit()?;

    Ok(())
}
