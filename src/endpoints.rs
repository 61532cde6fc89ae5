//! The API endpoint URIs.

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for the spending-by-category aggregation.
pub const SPENDING_BY_CATEGORY: &str = "/api/transactions/by-category";
/// The route to refund an expense transaction.
pub const REFUND_TRANSACTION: &str = "/api/transactions/refund/{transaction_id}";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
