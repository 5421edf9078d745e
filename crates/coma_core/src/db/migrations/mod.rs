//! Embedded schema migrations.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per entry.
//! - Pending migrations run in a single transaction together with the
//!   `user_version` bump, so a failed upgrade leaves the old schema intact.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Users, profiles, funders, tags, projects and the tag/project index.
const CATALOG: Migration = Migration {
    version: 1,
    name: "catalog",
    sql: include_str!("0001_catalog.sql"),
};

/// Spaces, posts, comments and project annotations.
const COMMUNITY: Migration = Migration {
    version: 2,
    name: "community",
    sql: include_str!("0002_community.sql"),
};

const MIGRATIONS: &[Migration] = &[CATALOG, COMMUNITY];

/// Newest schema version this build can create or read.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Runs every migration newer than the recorded schema version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", migration.version))
            .map_err(|source| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        info!(
            "event=db_migrate module=db status=ok from={} version={} name={}",
            current, migration.version, migration.name
        );
    }
    tx.commit()?;
    Ok(())
}
