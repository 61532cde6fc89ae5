//! Defines the endpoint for listing transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState,
    transaction::core::{DEFAULT_TRANSACTION_LIMIT, list_transactions},
};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// The maximum number of transactions to return.
    pub limit: Option<u64>,
}

/// A route handler that lists transactions ordered by date descending.
///
/// Returns at most `limit` transactions, or [DEFAULT_TRANSACTION_LIMIT] when
/// the parameter is absent.
///
/// # Panics
/// Panics if the lock for the database connection is poisoned.
pub async fn list_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);

    let connection = state.db_connection.lock().unwrap();

    match list_transactions(limit, &connection) {
        Ok(transactions) => (StatusCode::OK, Json(transactions)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod list_transactions_endpoint_tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::Value;

    use crate::{
        AppState, endpoints,
        transaction::{TransactionPayload, core::create_transaction},
    };

    use super::list_transactions_endpoint;

    fn get_test_server_with_state() -> (TestServer, AppState) {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn, false).unwrap();
        let app = Router::new()
            .route(endpoints::TRANSACTIONS, get(list_transactions_endpoint))
            .with_state(state.clone());
        let server = TestServer::new(app);

        (server, state)
    }

    fn create_many(state: &AppState, count: usize) {
        let connection = state.db_connection.lock().unwrap();
        for i in 0..count {
            create_transaction(
                TransactionPayload {
                    amount: Some(1.0 + i as f64),
                    category: Some("Groceries".to_string()),
                    kind: Some("expense".to_string()),
                    description: Some(format!("transaction #{i}")),
                },
                false,
                &connection,
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn returns_all_transactions_as_json_array() {
        let (server, state) = get_test_server_with_state();
        create_many(&state, 3);

        let response = server.get(endpoints::TRANSACTIONS).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn limit_parameter_truncates_the_listing() {
        let (server, state) = get_test_server_with_state();
        create_many(&state, 5);

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("limit", 2)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn listing_is_capped_at_50_by_default() {
        let (server, state) = get_test_server_with_state();
        create_many(&state, 60);

        let response = server.get(endpoints::TRANSACTIONS).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 50);
    }
}
