//! The category registry: the set of labels transactions may be grouped
//! under, with its list/create endpoints.
//!
//! Whether the Transaction Service consults the registry is a deployment
//! policy (`--enforce-categories`); the registry itself is always available.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{AppState, Error};

/// A category label in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The unique category name.
    pub name: String,
}

/// Add `name` to the category registry.
///
/// # Errors
/// This function will return:
/// - [Error::DuplicateCategory] if the name is already registered,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create(name: String, connection: &Connection) -> Result<Category, Error> {
    connection
        .execute("INSERT INTO category (name) VALUES (?1)", [&name])
        .map_err(|error| match error {
            // Codes 1555 and 2067 occur when a PRIMARY KEY or UNIQUE
            // constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == 1555 || sql_error.extended_code == 2067 =>
            {
                Error::DuplicateCategory(name.clone())
            }
            error => error.into(),
        })?;

    Ok(Category { name })
}

/// Whether `name` is registered.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn exists(name: &str, connection: &Connection) -> Result<bool, Error> {
    let exists = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM category WHERE name = :name)",
        &[(":name", &name)],
        |row| row.get(0),
    )?;

    Ok(exists)
}

/// All registered categories, ordered by name.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn list(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT name FROM category ORDER BY name")?
        .query_map([], |row| Ok(Category { name: row.get(0)? }))?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// The state needed to read or modify the category registry.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection holding the registry.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    /// The category name to register.
    pub name: Option<String>,
}

/// A route handler that lists all registered categories.
///
/// # Panics
/// Panics if the lock for the database connection is poisoned.
pub async fn list_categories_endpoint(State(state): State<CategoryState>) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    match list(&connection) {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler that registers a new category.
///
/// # Panics
/// Panics if the lock for the database connection is poisoned.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Json(payload): Json<CategoryPayload>,
) -> impl IntoResponse {
    let name = match payload.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return Error::Validation(vec!["Category name is required".to_string()])
                .into_response();
        }
    };

    let connection = state.db_connection.lock().unwrap();

    match create(name, &connection) {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(error) => error.into_response(),
    }
}


#[cfg(test)]
mod category_endpoint_tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, endpoints};

    use super::{create_category_endpoint, list_categories_endpoint};

    fn get_test_server() -> TestServer {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn, false).unwrap();
        let app = Router::new()
            .route(
                endpoints::CATEGORIES,
                get(list_categories_endpoint).post(create_category_endpoint),
            )
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Groceries" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let response = server.get(endpoints::CATEGORIES).await;
        response.assert_status_ok();
        response.assert_json(&json!([{ "name": "Groceries" }]));
    }

    #[tokio::test]
    async fn create_rejects_missing_name() {
        let server = get_test_server();

        let response = server.post(endpoints::CATEGORIES).json(&json!({})).await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn duplicate_name_is_a_client_error() {
        let server = get_test_server();

        server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Groceries" }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Groceries" }))
            .await;

        response.assert_status_bad_request();
    }
}
