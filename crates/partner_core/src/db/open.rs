//! Connection bootstrap.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` so partner deletes cascade.
//! - Returned connections are migrated to the latest schema.

use super::migrations::{apply_migrations, latest_version};
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Target {
    File(PathBuf),
    Memory,
}

impl Target {
    fn label(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::Memory => Connection::open_in_memory(),
        }
    }
}

/// Opens (creating if needed) the portal database at `path`.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_target(&Target::File(path.as_ref().to_path_buf()))
}

/// Opens a private in-memory database; each call is isolated.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_target(&Target::Memory)
}

fn open_target(target: &Target) -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = target
        .connect()
        .map_err(DbError::from)
        .and_then(|mut conn| configure(&mut conn).map(|applied| (conn, applied)));

    match result {
        Ok((conn, applied)) => {
            info!(
                "event=db_open module=db status=ok mode={} schema_version={} migrations_applied={} duration_ms={}",
                target.label(),
                latest_version(),
                applied,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error={}",
                target.label(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure(conn: &mut Connection) -> DbResult<usize> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}
