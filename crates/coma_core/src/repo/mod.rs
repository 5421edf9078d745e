//! Repository layer: SQLite persistence for every domain entity.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Translate storage failures into the domain error taxonomy
//!   (validation, conflict, not-found).
//!
//! # Invariants
//! - Write paths call `validate()` before any SQL mutation.
//! - Every create runs in one transaction: the row and its required
//!   associations commit together or not at all.
//! - Foreign keys are checked inside the write transaction so callers get a
//!   typed `NotFound` instead of a raw constraint failure.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::{EntityKind, ValidationError};
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod community_repo;
pub mod funding_repo;
pub mod tag_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse error classification reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Storage,
}

/// Uniqueness or one-to-one constraint violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// Another user already owns this email.
    EmailInUse(String),
    /// Another tag already has this name.
    TagNameInUse(String),
    /// The user already has a profile.
    ProfileExists(Uuid),
    /// Row cannot be deleted while dependents still reference it.
    StillReferenced {
        entity: EntityKind,
        id: Uuid,
        referenced_by: EntityKind,
    },
    /// Bulk delete of a kind blocked by rows of other kinds referencing it.
    KindStillReferenced(EntityKind),
}

impl Display for ConflictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailInUse(email) => write!(f, "email already in use: {email}"),
            Self::TagNameInUse(name) => write!(f, "tag name already in use: {name}"),
            Self::ProfileExists(user_id) => write!(f, "user {user_id} already has a profile"),
            Self::StillReferenced {
                entity,
                id,
                referenced_by,
            } => write!(f, "{entity} {id} is still referenced by {referenced_by} rows"),
            Self::KindStillReferenced(entity) => {
                write!(f, "{entity} rows are still referenced by other rows")
            }
        }
    }
}

impl Error for ConflictError {}

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Conflict(ConflictError),
    NotFound { entity: EntityKind, id: Uuid },
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Db(_) | Self::InvalidData(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(entity: EntityKind, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Conflict(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConflictError> for RepoError {
    fn from(value: ConflictError) -> Self {
        Self::Conflict(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, column: &str) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

/// Returns whether a row with `id` exists in the table backing `entity`.
pub(crate) fn row_exists(conn: &Connection, entity: EntityKind, id: Uuid) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);", entity.table()),
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Fails with `NotFound` unless `id` resolves in the table backing `entity`.
pub(crate) fn ensure_exists(conn: &Connection, entity: EntityKind, id: Uuid) -> RepoResult<()> {
    if row_exists(conn, entity, id)? {
        Ok(())
    } else {
        Err(RepoError::not_found(entity, id))
    }
}

/// Fails with `StillReferenced` when any row of `referenced_by` points at `id`
/// through `column`.
pub(crate) fn ensure_unreferenced(
    conn: &Connection,
    entity: EntityKind,
    id: Uuid,
    referenced_by: EntityKind,
    column: &str,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {column} = ?1);",
            referenced_by.table()
        ),
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 1 {
        return Err(ConflictError::StillReferenced {
            entity,
            id,
            referenced_by,
        }
        .into());
    }
    Ok(())
}

/// Deletes one row by id; `NotFound` when nothing was removed.
pub(crate) fn delete_row(conn: &Connection, entity: EntityKind, id: Uuid) -> RepoResult<()> {
    let changed = conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1;", entity.table()),
        [id.to_string()],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found(entity, id));
    }
    Ok(())
}

/// Returns whether `err` is a SQLite UNIQUE/PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && (inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

/// Returns whether `err` is a SQLite FOREIGN KEY violation.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

pub(crate) fn parse_column<T>(
    value: &str,
    column: &str,
    parse: impl FnOnce(&str) -> Result<T, ValidationError>,
) -> RepoResult<T> {
    parse(value).map_err(|err| RepoError::InvalidData(format!("{err} in {column}")))
}
