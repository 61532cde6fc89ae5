//! Pocketbook is the ledger service behind a personal finance dashboard.
//!
//! This library provides a JSON REST API for recording income and expense
//! transactions, processing refunds, and aggregating spending by category.
//! Write requests can carry an `idempotency-key` header so that a retry
//! after an ambiguous failure does not record the same transaction twice.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod category;
mod db;
mod endpoints;
mod idempotency;
mod logging;
mod routing;
mod transaction;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;
pub use transaction::{Amount, CategorySpending, Transaction, TransactionStatus, TransactionType};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body was malformed or out of range.
    ///
    /// Holds one message per violated field so the client can fix everything
    /// in one round trip.
    #[error("invalid request: {0:?}")]
    Validation(Vec<String>),

    /// The requested transaction does not exist.
    #[error("the requested transaction could not be found")]
    NotFound,

    /// The request was well-formed but violates a business rule, e.g.
    /// refunding an income transaction or refunding twice.
    #[error("{0}")]
    InvalidOperation(&'static str),

    /// The category name already exists in the registry.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategory(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(messages) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": messages }))).into_response()
            }
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Transaction not found" })),
            )
                .into_response(),
            Error::InvalidOperation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Error::DuplicateCategory(name) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("The category \"{name}\" already exists") })),
            )
                .into_response(),
            // SQL errors are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
