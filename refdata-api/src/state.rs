use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Shared state for the query API.
///
/// The dashboard workload is a handful of read queries; a single
/// connection behind a mutex keeps the database access model identical
/// to the loader's (one synchronous connection).
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self { db: Arc::new(Mutex::new(conn)) }
    }
}
