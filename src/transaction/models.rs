//! Defines the transaction model, its enumerated fields, and the fixed-point
//! amount type used throughout the ledger.

use rusqlite::{
    Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// A monetary amount with fixed two-decimal precision.
///
/// Stored as an integer count of cents so that sums over the ledger are
/// exact. Serializes to and from a plain JSON number in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(i64);

impl Amount {
    /// Create an amount from a count of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Parse a decimal number as a positive amount with at most two decimal
    /// places.
    ///
    /// # Errors
    /// Returns a human-readable message suitable for a validation response
    /// if `value` is not finite, not positive, or has more than two decimal
    /// places.
    pub fn parse(value: f64) -> Result<Self, String> {
        if !value.is_finite() || value <= 0.0 {
            return Err("Amount must be a positive number".to_string());
        }

        let cents = value * 100.0;
        // The float error in `value * 100.0` grows with the value, while a
        // genuine third decimal place stays at 0.1 cents, so the tolerance
        // scales with the magnitude.
        let tolerance = (cents * f64::EPSILON * 4.0).max(1e-6);
        if (cents - cents.round()).abs() > tolerance {
            return Err("Amount must have at most 2 decimal places".to_string());
        }

        Ok(Self(cents.round() as i64))
    }

    /// The amount as a count of cents.
    pub fn cents(self) -> i64 {
        self.0
    }

    /// The amount in dollars.
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_dollars())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::parse(value).map_err(de::Error::custom)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount)
    }
}

/// Whether a transaction records money earned, money spent, or a reversal of
/// money spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
    /// A compensating transaction reversing an expense.
    Refund,
}

impl TransactionType {
    /// The lowercase string stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Refund => "refund",
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "refund" => Ok(Self::Refund),
            other => Err(FromSqlError::Other(
                format!("invalid transaction type {other:?}").into(),
            )),
        }
    }
}

/// The lifecycle state of a transaction.
///
/// Only expense transactions ever leave the `completed` state, and the
/// `completed` to `refunded` transition happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The transaction stands as recorded.
    Completed,
    /// The expense has been reversed by a refund transaction.
    Refunded,
}

impl TransactionStatus {
    /// The lowercase string stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Refunded => "refunded",
        }
    }
}

impl ToSql for TransactionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "completed" => Ok(Self::Completed),
            "refunded" => Ok(Self::Refunded),
            other => Err(FromSqlError::Other(
                format!("invalid transaction status {other:?}").into(),
            )),
        }
    }
}

/// A single recorded monetary event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Server-generated UUID, immutable.
    pub id: String,
    /// The value of the transaction in dollars, always positive.
    pub amount: Amount,
    /// The category label the transaction is grouped under.
    pub category: String,
    /// Income, expense, or refund. Immutable.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The lifecycle state, `completed` unless an expense has been refunded.
    pub status: TransactionStatus,
    /// Free text detailing the transaction.
    pub description: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub date: i64,
}

/// The request body for creating a transaction.
///
/// Every field deserializes as optional so validation can report all
/// violated fields in one response instead of failing on the first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPayload {
    /// The value of the transaction in dollars.
    pub amount: Option<f64>,
    /// The category label.
    pub category: Option<String>,
    /// "income" or "expense"; "refund" is rejected as a direct input.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Free text detailing the transaction.
    pub description: Option<String>,
}

/// One row of the spending-by-category aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    /// The expense category.
    pub category: String,
    /// The summed amount of all expenses in the category.
    pub amount: Amount,
    /// How many expense transactions make up the sum.
    #[serde(rename = "transactionCount")]
    pub transaction_count: i64,
}

/// Convert a `transactions` table row into a [Transaction].
///
/// Expects the columns in table order: id, amount, category, description,
/// type, status, date.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        kind: row.get(4)?,
        status: row.get(5)?,
        date: row.get(6)?,
    })
}
