//! Defines the endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState,
    idempotency::{IDEMPOTENCY_KEY_HEADER, IdempotencyCache},
    transaction::{TransactionPayload, core::create_transaction},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The cache that deduplicates retried create requests.
    pub idempotency_cache: IdempotencyCache,
    /// Whether the category must exist in the category registry.
    pub enforce_category_registry: bool,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            idempotency_cache: state.idempotency_cache.clone(),
            enforce_category_registry: state.enforce_category_registry,
        }
    }
}

/// A route handler for creating a new income or expense transaction.
///
/// An optional `idempotency-key` header makes the request safe to retry: the
/// first successful response is cached under the key and replayed (with
/// status 200 instead of 201) for any repeat, without touching the database.
///
/// # Panics
/// Panics if the lock for the database connection is poisoned.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    headers: HeaderMap,
    Json(payload): Json<TransactionPayload>,
) -> Response {
    let idempotency_key = extract_idempotency_key(&headers);

    // The key guard is held until the response is ready so a concurrent
    // retry with the same unseen key waits here and then hits the cache.
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
        create_transaction(payload, state.enforce_category_registry, &connection)
    };

    match result {
        Ok(transaction) => {
            if let Some(key) = idempotency_key {
                state.idempotency_cache.store(key, transaction.clone());
            }

            (StatusCode::CREATED, Json(transaction)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

/// The `idempotency-key` header value, if present and valid UTF-8.
pub(super) fn extract_idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
