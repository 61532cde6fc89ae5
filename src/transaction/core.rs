//! The ledger write and read paths, independent of any HTTP concerns.

use rusqlite::Connection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, category};

use super::models::{
    Amount, CategorySpending, Transaction, TransactionPayload, TransactionStatus, TransactionType,
    map_transaction_row,
};

/// How many transactions a listing returns when the client does not ask for
/// a specific limit.
pub const DEFAULT_TRANSACTION_LIMIT: u64 = 50;

/// The current time in milliseconds since the Unix epoch.
fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Validate `payload` and insert a new income or expense transaction.
///
/// Validation reports every violated field, not just the first. When
/// `enforce_category_registry` is set, the category must already exist in
/// the registry. No row is written on any validation failure.
///
/// # Errors
/// Returns [Error::Validation] listing the violated fields, or
/// [Error::SqlError] if the insert fails.
pub fn create_transaction(
    payload: TransactionPayload,
    enforce_category_registry: bool,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let (amount, category_name, kind, description) = validate_payload(payload)?;

    if enforce_category_registry && !category::exists(&category_name, connection)? {
        return Err(Error::Validation(vec!["Invalid category".to_string()]));
    }

    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        amount,
        category: category_name,
        kind,
        status: TransactionStatus::Completed,
        description,
        date: now_ms(),
    };

    insert_transaction(connection, &transaction)?;

    Ok(transaction)
}

/// Check every field of `payload`, collecting a message per violation.
fn validate_payload(
    payload: TransactionPayload,
) -> Result<(Amount, String, TransactionType, String), Error> {
    let mut violations = Vec::new();

    let amount = match payload.amount.map(Amount::parse) {
        Some(Ok(amount)) => Some(amount),
        Some(Err(message)) => {
            violations.push(message);
            None
        }
        None => {
            violations.push("Amount must be a positive number".to_string());
            None
        }
    };

    let category = match payload.category {
        Some(category) if !category.trim().is_empty() => Some(category),
        _ => {
            violations.push("Category is required".to_string());
            None
        }
    };

    // Refund transactions are only ever created by the refund path, so
    // "refund" is not accepted as a direct input type.
    let kind = match payload.kind.as_deref() {
        Some("income") => Some(TransactionType::Income),
        Some("expense") => Some(TransactionType::Expense),
        _ => {
            violations.push("Type must be income or expense".to_string());
            None
        }
    };

    let description = match payload.description {
        Some(description) if !description.trim().is_empty() => Some(description),
        _ => {
            violations.push("Description is required".to_string());
            None
        }
    };

    match (amount, category, kind, description) {
        (Some(amount), Some(category), Some(kind), Some(description)) => {
            Ok((amount, category, kind, description))
        }
        _ => Err(Error::Validation(violations)),
    }
}

/// Refund the expense transaction `transaction_id`.
///
/// Creates a compensating refund transaction with the original's amount and
/// category, and flips the original's status to `refunded`. Both writes
/// happen in one SQL transaction; if either fails, neither is persisted.
///
/// The status flip is a conditional update on `status = 'completed'` checked
/// for exactly one affected row, so of two racing refunds for the same
/// original only one can commit.
///
/// # Errors
/// This function will return:
/// - [Error::NotFound] if `transaction_id` does not refer to a transaction,
/// - [Error::InvalidOperation] if the transaction is not an expense or has
///   already been refunded,
/// - [Error::SqlError] if there is some other SQL error.
pub fn process_refund(transaction_id: &str, connection: &Connection) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let original = sql_transaction
        .prepare(
            "SELECT id, amount, category, description, type, status, date
             FROM transactions WHERE id = :id",
        )?
        .query_row(&[(":id", &transaction_id)], map_transaction_row)?;

    if original.kind != TransactionType::Expense {
        return Err(Error::InvalidOperation(
            "Can only refund expense transactions",
        ));
    }

    if original.status == TransactionStatus::Refunded {
        return Err(Error::InvalidOperation("Transaction already refunded"));
    }

    // The conditional update is the source of truth for the status
    // transition; the read above only produces the error messages.
    let rows_updated = sql_transaction.execute(
        "UPDATE transactions SET status = 'refunded' WHERE id = ?1 AND status = 'completed'",
        [transaction_id],
    )?;

    if rows_updated != 1 {
        return Err(Error::InvalidOperation("Transaction already refunded"));
    }

    let refund = Transaction {
        id: Uuid::new_v4().to_string(),
        amount: original.amount,
        category: original.category,
        kind: TransactionType::Refund,
        status: TransactionStatus::Completed,
        description: format!("Refund for transaction {transaction_id}"),
        date: now_ms(),
    };

    insert_transaction(&sql_transaction, &refund)?;

    sql_transaction.commit()?;

    Ok(refund)
}

/// Retrieve up to `limit` transactions ordered by date descending.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn list_transactions(limit: u64, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    // A negative LIMIT means unlimited in SQLite, so an overflowing cast
    // must saturate instead of wrapping.
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    connection
        .prepare(
            "SELECT id, amount, category, description, type, status, date
             FROM transactions ORDER BY date DESC LIMIT :limit",
        )?
        .query_map(&[(":limit", &limit)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Group all expense transactions by category with summed amounts and row
/// counts.
///
/// Income and refund transactions are excluded. Read-only.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn spending_by_category(connection: &Connection) -> Result<Vec<CategorySpending>, Error> {
    connection
        .prepare(
            "SELECT category, SUM(amount), COUNT(*)
             FROM transactions WHERE type = 'expense'
             GROUP BY category ORDER BY category",
        )?
        .query_map([], |row| {
            Ok(CategorySpending {
                category: row.get(0)?,
                amount: row.get(1)?,
                transaction_count: row.get(2)?,
            })
        })?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}

/// Insert `transaction` as a new row.
fn insert_transaction(connection: &Connection, transaction: &Transaction) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO transactions (id, amount, category, description, type, status, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            &transaction.id,
            transaction.amount,
            &transaction.category,
            &transaction.description,
            transaction.kind,
            transaction.status,
            transaction.date,
        ),
    )?;

    Ok(())
}


#[cfg(test)]
mod process_refund_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        transaction::{TransactionPayload, TransactionStatus, TransactionType},
    };

    use super::{create_transaction, list_transactions, process_refund};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_expense(conn: &Connection, amount: f64) -> crate::transaction::Transaction {
        create_transaction(
            TransactionPayload {
                amount: Some(amount),
                category: Some("Groceries".to_string()),
                kind: Some("expense".to_string()),
                description: Some("Weekly shop".to_string()),
            },
            false,
            conn,
        )
        .unwrap()
    }

    #[test]
    fn refund_creates_compensating_transaction_and_flips_status() {
        let conn = get_test_connection();
        let expense = create_expense(&conn, 75.0);

        let refund = process_refund(&expense.id, &conn).unwrap();

        assert_eq!(refund.kind, TransactionType::Refund);
        assert_eq!(refund.amount, expense.amount);
        assert_eq!(refund.category, expense.category);
        assert_eq!(refund.status, TransactionStatus::Completed);
        assert_eq!(
            refund.description,
            format!("Refund for transaction {}", expense.id)
        );

        let listed = list_transactions(50, &conn).unwrap();
        assert_eq!(listed.len(), 2);
        let original = listed.iter().find(|t| t.id == expense.id).unwrap();
        assert_eq!(original.status, TransactionStatus::Refunded);
    }

    #[test]
    fn refund_fails_for_unknown_id() {
        let conn = get_test_connection();

        let result = process_refund("no-such-id", &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn refund_rejects_income_transactions() {
        let conn = get_test_connection();
        let income = create_transaction(
            TransactionPayload {
                amount: Some(500.0),
                category: Some("Salary".to_string()),
                kind: Some("income".to_string()),
                description: Some("Payday".to_string()),
            },
            false,
            &conn,
        )
        .unwrap();

        let result = process_refund(&income.id, &conn);

        assert_eq!(
            result,
            Err(Error::InvalidOperation(
                "Can only refund expense transactions"
            ))
        );
        assert_eq!(list_transactions(50, &conn).unwrap().len(), 1);
    }

    #[test]
    fn refund_rejects_already_refunded_transactions() {
        let conn = get_test_connection();
        let expense = create_expense(&conn, 75.0);
        process_refund(&expense.id, &conn).unwrap();

        let result = process_refund(&expense.id, &conn);

        assert_eq!(
            result,
            Err(Error::InvalidOperation("Transaction already refunded"))
        );
        // No second refund row.
        assert_eq!(list_transactions(50, &conn).unwrap().len(), 2);
    }

    #[test]
    fn refund_transactions_are_never_themselves_refundable() {
        let conn = get_test_connection();
        let expense = create_expense(&conn, 75.0);
        let refund = process_refund(&expense.id, &conn).unwrap();

        let result = process_refund(&refund.id, &conn);

        assert_eq!(
            result,
            Err(Error::InvalidOperation(
                "Can only refund expense transactions"
            ))
        );
    }

    #[test]
    fn conditional_update_wins_over_stale_read() {
        // Flip the status behind the read path's back; the CAS must refuse
        // to commit a second refund even though a plain read-then-write
        // would have proceeded.
        let conn = get_test_connection();
        let expense = create_expense(&conn, 75.0);

        conn.execute(
            "UPDATE transactions SET status = 'refunded' WHERE id = ?1",
            [&expense.id],
        )
        .unwrap();

        let result = process_refund(&expense.id, &conn);

        assert_eq!(
            result,
            Err(Error::InvalidOperation("Transaction already refunded"))
        );
        assert_eq!(list_transactions(50, &conn).unwrap().len(), 1);
    }
}
