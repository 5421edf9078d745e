//! Domain store handle.
//!
//! # Responsibility
//! - Own the single SQLite connection for the lifetime of one unit of work.
//! - Hand out repositories borrowing that connection.
//! - Provide per-kind bulk operations (`count`, `delete_all`).
//!
//! # Invariants
//! - A `Store` is always migrated and has foreign keys enabled.
//! - The connection is released by `close`, or on drop on every other path.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::EntityKind;
use crate::repo::community_repo::SqliteCommunityRepository;
use crate::repo::funding_repo::SqliteFundingRepository;
use crate::repo::tag_repo::SqliteTagRepository;
use crate::repo::user_repo::SqliteUserRepository;
use crate::repo::{is_foreign_key_violation, ConflictError, RepoError, RepoResult};
use log::{error, info};
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// SQLite database file, created on first open.
    File(PathBuf),
    /// Private in-memory database discarded on close.
    Memory,
}

impl Display for StoreTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(":memory:"),
        }
    }
}

/// Explicitly passed handle to the domain store.
pub struct Store {
    conn: Connection,
    target: StoreTarget,
}

impl Store {
    pub fn open(target: &StoreTarget) -> DbResult<Self> {
        let conn = match target {
            StoreTarget::File(path) => open_db(path)?,
            StoreTarget::Memory => open_db_in_memory()?,
        };
        Ok(Self {
            conn,
            target: target.clone(),
        })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&StoreTarget::Memory)
    }

    pub fn target(&self) -> &StoreTarget {
        &self.target
    }

    pub fn users(&self) -> SqliteUserRepository<'_> {
        SqliteUserRepository::new(&self.conn)
    }

    pub fn funding(&self) -> SqliteFundingRepository<'_> {
        SqliteFundingRepository::new(&self.conn)
    }

    pub fn tags(&self) -> SqliteTagRepository<'_> {
        SqliteTagRepository::new(&self.conn)
    }

    pub fn community(&self) -> SqliteCommunityRepository<'_> {
        SqliteCommunityRepository::new(&self.conn)
    }

    /// Number of rows of one entity kind.
    pub fn count(&self, kind: EntityKind) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count.unsigned_abs())
    }

    /// Deletes every row of one entity kind and returns how many were removed.
    ///
    /// Restricting foreign keys still apply: callers clear dependents first
    /// (see `seed::plan::clear_order`), otherwise `KindStillReferenced`.
    pub fn delete_all(&self, kind: EntityKind) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {};", kind.table()), [])
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    RepoError::Conflict(ConflictError::KindStillReferenced(kind))
                } else {
                    RepoError::from(err)
                }
            })?;
        info!(
            "event=store_delete_all module=store status=ok kind={} removed={}",
            kind, removed
        );
        Ok(removed)
    }

    /// Releases the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> DbResult<()> {
        let target = self.target;
        match self.conn.close() {
            Ok(()) => {
                info!("event=db_close module=store status=ok target={target}");
                Ok(())
            }
            Err((_conn, err)) => {
                error!(
                    "event=db_close module=store status=error target={} error={}",
                    target, err
                );
                Err(DbError::Sqlite(err))
            }
        }
    }
}
