//! Defines the endpoint for the spending-by-category aggregation.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{AppState, transaction::core::spending_by_category};

/// The state needed to aggregate spending.
#[derive(Debug, Clone)]
pub struct SpendingByCategoryState {
    /// The database connection for the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SpendingByCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that groups expense transactions by category with summed
/// amounts and counts.
///
/// # Panics
/// Panics if the lock for the database connection is poisoned.
pub async fn spending_by_category_endpoint(
    State(state): State<SpendingByCategoryState>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    match spending_by_category(&connection) {
        Ok(spending) => (StatusCode::OK, Json(spending)).into_response(),
        Err(error) => error.into_response(),
    }
}
