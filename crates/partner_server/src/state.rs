//! Shared server state.
//!
//! # Invariants
//! - The connection lock is held only for one synchronous service call and
//!   is never held across an `.await`.

use crate::error::ApiError;
use partner_form::ApiChecker;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    db: Mutex<Connection>,
    checker: ApiChecker,
}

impl AppState {
    pub fn new(conn: Connection, checker: ApiChecker) -> Self {
        Self {
            db: Mutex::new(conn),
            checker,
        }
    }

    pub fn shared(conn: Connection, checker: ApiChecker) -> SharedState {
        Arc::new(Self::new(conn, checker))
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let conn = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))?;
        f(&conn)
    }

    pub fn checker(&self) -> &ApiChecker {
        &self.checker
    }
}
