//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, db::initialize, idempotency::IdempotencyCache};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The cache that deduplicates retried write requests.
    pub idempotency_cache: IdempotencyCache,

    /// Whether transaction categories must exist in the category registry.
    pub enforce_category_registry: bool,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the ledger.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, enforce_category_registry: bool) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            idempotency_cache: IdempotencyCache::new(),
            enforce_category_registry,
        })
    }
}
