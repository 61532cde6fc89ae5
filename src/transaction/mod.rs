//! The transaction ledger: models, the write/read core, and route handlers.

pub mod core;
mod create_endpoint;
mod list_endpoint;
mod models;
mod refund_endpoint;
mod spending_endpoint;

pub use create_endpoint::create_transaction_endpoint;
pub use list_endpoint::list_transactions_endpoint;
pub use models::{
    Amount, CategorySpending, Transaction, TransactionPayload, TransactionStatus, TransactionType,
};
pub use refund_endpoint::refund_transaction_endpoint;
pub use spending_endpoint::spending_by_category_endpoint;
