//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate domain records before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

use crate::db::DbError;
use crate::model::partner::PartnerValidationError;
use rusqlite::types::Value as SqlValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod config_repo;
pub mod partner_repo;
pub mod screen_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PartnerValidationError),
    Db(DbError),
    /// Target row does not exist; carries the table and key for diagnostics.
    NotFound {
        entity: &'static str,
        key: String,
    },
    /// A unique constraint rejected the write.
    Conflict(String),
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::Conflict(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<PartnerValidationError> for RepoError {
    fn from(value: PartnerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if is_unique_violation(&value) {
            return Self::Conflict(value.to_string());
        }
        Self::Db(DbError::Sqlite(value))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Current time in epoch milliseconds.
pub(crate) const NOW_MS_SQL: &str = "(CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))";

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn encode_json<T: Serialize>(value: &T, column: &'static str) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode {column}: {err}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(text: &str, column: &'static str) -> RepoResult<T> {
    serde_json::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

/// Builds `?, ?, ?` for an `IN (...)` clause with `count` binds.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub(crate) fn uuid_binds(ids: &[Uuid]) -> Vec<SqlValue> {
    ids.iter().map(|id| SqlValue::Text(id.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::NOW_MS_SQL;
    use crate::db::open_db_in_memory;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[test]
    fn sql_clock_has_millisecond_resolution() {
        let conn = open_db_in_memory().unwrap();
        let mut samples = Vec::new();
        for _ in 0..4 {
            let now: i64 = conn
                .query_row(&format!("SELECT {NOW_MS_SQL}"), [], |row| row.get(0))
                .unwrap();
            samples.push(now);
            std::thread::sleep(Duration::from_millis(3));
        }

        let wall = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64;
        assert!(samples.iter().all(|sample| (wall - sample).abs() < 5_000));
        assert!(samples.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(samples.iter().any(|sample| sample % 1000 != 0));
    }

    #[test]
    fn column_defaults_use_the_same_clock() {
        let conn = open_db_in_memory().unwrap();
        conn.execute(
            "INSERT INTO partners (id, name) VALUES ('00000000-0000-0000-0000-000000000001', 'clock')",
            [],
        )
        .unwrap();
        let (created, now): (i64, i64) = conn
            .query_row(
                &format!("SELECT created_at, {NOW_MS_SQL} FROM partners WHERE name = 'clock'"),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(created <= now);
        assert!(now - created < 1_000);
    }
}
