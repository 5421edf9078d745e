//! Tag repository and the tag/project association index.
//!
//! # Responsibility
//! - Persist the shared tag vocabulary.
//! - Maintain `project_tags` as a bidirectional index: tags of a project and
//!   projects bearing a tag.
//!
//! # Invariants
//! - A (project, tag) pair appears at most once (composite primary key).
//! - Attach is idempotent: re-attaching an existing link is a no-op.
//! - Detaching never deletes a tag, even when it loses its last project.
//! - Deleting a tag or a project removes its links, never the other side.

use crate::model::funding::ProjectId;
use crate::model::tag::{Tag, TagId};
use crate::model::EntityKind;
use crate::repo::{
    delete_row, ensure_exists, is_unique_violation, parse_uuid, ConflictError, RepoError,
    RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TAG_SELECT_SQL: &str = "SELECT
    id,
    name,
    category,
    created_at
FROM tags";

/// Repository interface for tags and project associations.
pub trait TagRepository {
    fn create_tag(&self, tag: &Tag) -> RepoResult<TagId>;
    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>>;
    /// Case-insensitive lookup by name.
    fn find_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>>;
    /// Lists tags ordered by name, optionally restricted to one category.
    fn list_tags(&self, category: Option<&str>) -> RepoResult<Vec<Tag>>;
    /// Replaces name and category.
    fn update_tag(&self, tag: &Tag) -> RepoResult<()>;
    fn delete_tag(&self, id: TagId) -> RepoResult<()>;

    /// Links tags to a project; returns how many links were new.
    fn attach_tags(&self, project_id: ProjectId, tag_ids: &[TagId]) -> RepoResult<usize>;
    /// Unlinks tags from a project; returns how many links were removed.
    fn detach_tags(&self, project_id: ProjectId, tag_ids: &[TagId]) -> RepoResult<usize>;
    /// Tags linked to `project_id`, ordered by name.
    fn tags_of_project(&self, project_id: ProjectId) -> RepoResult<Vec<Tag>>;
    /// Ids of projects bearing `tag_id`, ordered by project title.
    fn projects_with_tag(&self, tag_id: TagId) -> RepoResult<Vec<ProjectId>>;
    /// Total number of association rows.
    fn count_links(&self) -> RepoResult<u64>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, tag: &Tag) -> RepoResult<TagId> {
        tag.validate()?;
        let name = tag.name.trim();
        ensure_tag_name_free(self.conn, name, None)?;

        self.conn
            .execute(
                "INSERT INTO tags (id, name, category, created_at) VALUES (?1, ?2, ?3, ?4);",
                params![
                    tag.id.to_string(),
                    name,
                    tag.category.as_deref(),
                    tag.created_at,
                ],
            )
            .map_err(|err| map_tag_name_violation(err, name))?;
        Ok(tag.id)
    }

    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TAG_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_tag_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TAG_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([name.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_tag_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_tags(&self, category: Option<&str>) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TAG_SELECT_SQL}
             WHERE (?1 IS NULL OR category = ?1)
             ORDER BY name COLLATE NOCASE ASC;"
        ))?;
        let mut rows = stmt.query([category])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn update_tag(&self, tag: &Tag) -> RepoResult<()> {
        tag.validate()?;
        let name = tag.name.trim();
        ensure_tag_name_free(self.conn, name, Some(tag.id))?;

        let changed = self
            .conn
            .execute(
                "UPDATE tags SET name = ?2, category = ?3 WHERE id = ?1;",
                params![tag.id.to_string(), name, tag.category.as_deref()],
            )
            .map_err(|err| map_tag_name_violation(err, name))?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Tag, tag.id));
        }
        Ok(())
    }

    fn delete_tag(&self, id: TagId) -> RepoResult<()> {
        delete_row(self.conn, EntityKind::Tag, id)
    }

    fn attach_tags(&self, project_id: ProjectId, tag_ids: &[TagId]) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Project, project_id)?;
        let linked = link_tags(&tx, project_id, tag_ids)?;
        tx.commit()?;

        debug!(
            "event=tags_attach module=repo status=ok project_id={project_id} requested={} linked={linked}",
            tag_ids.len()
        );
        Ok(linked)
    }

    fn detach_tags(&self, project_id: ProjectId, tag_ids: &[TagId]) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Project, project_id)?;
        let mut removed = 0;
        for tag_id in tag_ids {
            removed += tx.execute(
                "DELETE FROM project_tags WHERE project_id = ?1 AND tag_id = ?2;",
                params![project_id.to_string(), tag_id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn tags_of_project(&self, project_id: ProjectId) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id AS id, t.name AS name, t.category AS category, t.created_at AS created_at
             FROM project_tags pt
             INNER JOIN tags t ON t.id = pt.tag_id
             WHERE pt.project_id = ?1
             ORDER BY t.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn projects_with_tag(&self, tag_id: TagId) -> RepoResult<Vec<ProjectId>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id
             FROM project_tags pt
             INNER JOIN projects p ON p.id = pt.project_id
             WHERE pt.tag_id = ?1
             ORDER BY p.title COLLATE NOCASE ASC, p.id ASC;",
        )?;
        let mut rows = stmt.query([tag_id.to_string()])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            projects.push(parse_uuid(&id, "projects.id")?);
        }
        Ok(projects)
    }

    fn count_links(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM project_tags;", [], |row| row.get(0))?;
        Ok(count.unsigned_abs())
    }
}

/// Links every tag in `tag_ids` to `project_id` on an open transaction.
///
/// Fails with `NotFound` on the first unknown tag; existing links are kept
/// as they are. Returns the number of links that were newly created.
pub(crate) fn link_tags(
    conn: &Connection,
    project_id: ProjectId,
    tag_ids: &[TagId],
) -> RepoResult<usize> {
    let mut linked = 0;
    for tag_id in tag_ids {
        ensure_exists(conn, EntityKind::Tag, *tag_id)?;
        linked += conn.execute(
            "INSERT OR IGNORE INTO project_tags (project_id, tag_id) VALUES (?1, ?2);",
            params![project_id.to_string(), tag_id.to_string()],
        )?;
    }
    Ok(linked)
}

fn ensure_tag_name_free(conn: &Connection, name: &str, except: Option<TagId>) -> RepoResult<()> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE;",
            [name.trim()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(owner) = owner else {
        return Ok(());
    };
    if except.is_some_and(|id| id.to_string() == owner) {
        return Ok(());
    }
    Err(ConflictError::TagNameInUse(name.to_string()).into())
}

fn map_tag_name_violation(err: rusqlite::Error, name: &str) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::Conflict(ConflictError::TagNameInUse(name.to_string()))
    } else {
        RepoError::from(err)
    }
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let id: String = row.get("id")?;
    let tag = Tag {
        id: parse_uuid(&id, "tags.id")?,
        name: row.get("name")?,
        category: row.get("category")?,
        created_at: row.get("created_at")?,
    };
    tag.validate()
        .map_err(|err| RepoError::InvalidData(format!("tag {}: {err}", tag.id)))?;
    Ok(tag)
}
