//! Connection bootstrap for the domain store.
//!
//! Every connection goes through the same steps: enable foreign keys, set a
//! busy timeout, migrate, then verify that no stored row dangles.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) a database file and brings it up to date.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    bootstrap(&path.display().to_string(), || Connection::open(path))
}

/// Opens a private in-memory database that lives as long as the connection.
pub fn open_db_in_memory() -> DbResult<Connection> {
    bootstrap(":memory:", Connection::open_in_memory)
}

fn bootstrap(
    target: &str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let outcome = connect()
        .map_err(DbError::from)
        .and_then(|mut conn| configure(&mut conn).map(|()| conn));

    match &outcome {
        Ok(_) => info!(
            "event=db_open module=db status=ok target={} duration_ms={}",
            target,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error target={} duration_ms={} error={}",
            target,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    outcome
}

fn configure(conn: &mut Connection) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    check_foreign_keys(conn)
}

/// Fails when `PRAGMA foreign_key_check` reports any violation.
///
/// Rows written by tools that ran with foreign keys off are the usual source.
fn check_foreign_keys(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check;")?;
    let mut rows = stmt.query([])?;
    let mut violations: BTreeMap<String, usize> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let table: String = row.get(0)?;
        *violations.entry(table).or_insert(0) += 1;
    }

    for (table, count) in &violations {
        warn!("event=db_fk_check module=db status=error table={table} rows={count}");
    }
    match violations.into_iter().next() {
        Some((table, rows)) => Err(DbError::DanglingReferences { table, rows }),
        None => Ok(()),
    }
}
