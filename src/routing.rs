//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::{
    AppState,
    category::{create_category_endpoint, list_categories_endpoint},
    endpoints,
    transaction::{
        create_transaction_endpoint, list_transactions_endpoint, refund_transaction_endpoint,
        spending_by_category_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::SPENDING_BY_CATEGORY,
            get(spending_by_category_endpoint),
        )
        .route(
            endpoints::REFUND_TRANSACTION,
            post(refund_transaction_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .fallback(get_404_not_found)
        // The dashboard is served from a different origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The JSON 404 response for unknown routes.
async fn get_404_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
