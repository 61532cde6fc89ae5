//! Defines the endpoint for refunding an expense transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState,
    idempotency::IdempotencyCache,
    transaction::{core::process_refund, create_endpoint::extract_idempotency_key},
};

/// The state needed to refund a transaction.
#[derive(Debug, Clone)]
pub struct RefundTransactionState {
    /// The database connection for the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The cache that deduplicates retried refund requests.
    pub idempotency_cache: IdempotencyCache,
}

impl FromRef<AppState> for RefundTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            idempotency_cache: state.idempotency_cache.clone(),
        }
    }
}

/// A route handler that refunds the expense transaction named in the path.
///
/// Creates a compensating refund transaction and marks the original as
/// refunded in one atomic unit. Supports the same `idempotency-key` header
/// as transaction creation, so a retried refund replays the first response
/// instead of failing with "already refunded".
///
/// # Panics
/// Panics if the lock for the database connection is poisoned.
pub async fn refund_transaction_endpoint(
    State(state): State<RefundTransactionState>,
    Path(transaction_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let idempotency_key = extract_idempotency_key(&headers);

    let _guard = match &idempotency_key {
        Some(key) => Some(state.idempotency_cache.key_guard(key).await),
        None => None,
    };

    if let Some(key) = &idempotency_key
        && let Some(cached) = state.idempotency_cache.lookup(key)
    {
        return (StatusCode::OK, Json(cached)).into_response();
    }

    let result = {
        let connection = state.db_connection.lock().unwrap();
        process_refund(&transaction_id, &connection)
    };

    match result {
        Ok(refund) => {
            if let Some(key) = idempotency_key {
                state.idempotency_cache.store(key, refund.clone());
            }

            (StatusCode::OK, Json(refund)).into_response()
        }
        Err(error) => error.into_response(),
    }
}
