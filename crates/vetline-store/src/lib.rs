//! Durable storage for finalized triage sessions.
//!
//! SQLite with WAL mode behind an `r2d2` pool, with embedded SQL migrations.
//! One finalized session is one record: its row, its ordered turns, and its
//! summary are written and read as a unit.

mod error;
pub mod migrations;
mod store;

pub use error::StoreError;
pub use migrations::{run_migrations, MigrationError};
pub use store::{list_records, load_record, save_record};

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;

/// Pooled SQLite handle shared by the finalizer and the display surface.
pub type StorePool = r2d2::Pool<SqliteConnectionManager>;

/// How the store opens SQLite for the session-record workload: short
/// single-record writes from the finalizer, occasional reads for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Pooled connection cap. Records are small and writes are rare, so a
    /// handful of connections covers the workload.
    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 4,
        }
    }
}

/// Opens (or creates) the store at `db_path` and applies pending migrations.
///
/// Every pooled connection comes up in WAL mode with foreign keys enforced.
/// `:memory:` is accepted, but each pooled connection then sees its own
/// empty database; file paths are the norm outside single-connection tests.
pub fn open(db_path: &str, settings: StoreSettings) -> Result<StorePool, StoreError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(move |conn| prepare_connection(conn, settings.busy_timeout));
    let pool = r2d2::Pool::builder()
        .max_size(settings.max_connections)
        .build(manager)?;

    let conn = pool.get()?;
    let applied = run_migrations(&conn)?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }
    Ok(pool)
}

/// Per-connection setup, run by the pool before a connection is handed out.
fn prepare_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // In-memory databases report "memory"; anything else means WAL was
    // refused, and a finalizer write would block the display reads.
    let journal: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    match journal.as_str() {
        "wal" | "memory" => Ok(()),
        other => Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("database refused WAL journal mode: {other}")),
        )),
    }
}
