//! Funder/project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist funders and the projects they fund.
//! - Create a project together with its tag associations atomically.
//!
//! # Invariants
//! - A project row is never written unless its funder and PI resolve.
//! - Deleting a funder is refused while projects reference it.
//! - Deleting a project cascades its annotations and tag links.

use crate::model::funding::{Funder, FunderId, Project, ProjectId, ProjectStatus};
use crate::model::tag::TagId;
use crate::model::user::UserId;
use crate::model::{now_epoch_ms, EntityKind};
use crate::repo::tag_repo::link_tags;
use crate::repo::{
    delete_row, ensure_exists, ensure_unreferenced, parse_column, parse_optional_uuid,
    parse_uuid, RepoError, RepoResult,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const FUNDER_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    website,
    country,
    created_at,
    updated_at
FROM funders";

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    title,
    summary,
    description,
    start_date,
    end_date,
    funding_amount,
    currency,
    status,
    funder_id,
    pi_user_id,
    created_at,
    updated_at
FROM projects";

/// Filter options for listing projects. Empty filters match every project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    pub status: Option<ProjectStatus>,
    pub funder_id: Option<FunderId>,
    pub pi_user_id: Option<UserId>,
    /// Only projects bearing this tag.
    pub tag_id: Option<TagId>,
}

/// Repository interface for funders and projects.
pub trait FundingRepository {
    fn create_funder(&self, funder: &Funder) -> RepoResult<FunderId>;
    fn get_funder(&self, id: FunderId) -> RepoResult<Option<Funder>>;
    /// Lists funders ordered by name.
    fn list_funders(&self) -> RepoResult<Vec<Funder>>;
    fn update_funder(&self, funder: &Funder) -> RepoResult<()>;
    fn delete_funder(&self, id: FunderId) -> RepoResult<()>;

    /// Creates a project and links `tag_ids` in one transaction.
    fn create_project(&self, project: &Project, tag_ids: &[TagId]) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Lists projects ordered by start date (newest first), then title.
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    /// Replaces every mutable project field; funder and PI must resolve.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed funder/project repository.
pub struct SqliteFundingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFundingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FundingRepository for SqliteFundingRepository<'_> {
    fn create_funder(&self, funder: &Funder) -> RepoResult<FunderId> {
        funder.validate()?;

        self.conn.execute(
            "INSERT INTO funders (
                id,
                name,
                description,
                website,
                country,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                funder.id.to_string(),
                funder.name.as_str(),
                funder.description.as_deref(),
                funder.website.as_deref(),
                funder.country.as_deref(),
                funder.created_at,
                funder.updated_at,
            ],
        )?;
        Ok(funder.id)
    }

    fn get_funder(&self, id: FunderId) -> RepoResult<Option<Funder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FUNDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_funder_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_funders(&self) -> RepoResult<Vec<Funder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FUNDER_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut funders = Vec::new();
        while let Some(row) = rows.next()? {
            funders.push(parse_funder_row(row)?);
        }
        Ok(funders)
    }

    fn update_funder(&self, funder: &Funder) -> RepoResult<()> {
        funder.validate()?;

        let changed = self.conn.execute(
            "UPDATE funders
             SET
                name = ?2,
                description = ?3,
                website = ?4,
                country = ?5,
                updated_at = ?6
             WHERE id = ?1;",
            params![
                funder.id.to_string(),
                funder.name.as_str(),
                funder.description.as_deref(),
                funder.website.as_deref(),
                funder.country.as_deref(),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Funder, funder.id));
        }
        Ok(())
    }

    fn delete_funder(&self, id: FunderId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Funder, id)?;
        ensure_unreferenced(&tx, EntityKind::Funder, id, EntityKind::Project, "funder_id")?;
        delete_row(&tx, EntityKind::Funder, id)?;
        tx.commit()?;
        Ok(())
    }

    fn create_project(&self, project: &Project, tag_ids: &[TagId]) -> RepoResult<ProjectId> {
        project.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        ensure_project_references(&tx, project)?;
        tx.execute(
            "INSERT INTO projects (
                id,
                title,
                summary,
                description,
                start_date,
                end_date,
                funding_amount,
                currency,
                status,
                funder_id,
                pi_user_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                project.id.to_string(),
                project.title.as_str(),
                project.summary.as_str(),
                project.description.as_deref(),
                project.start_date,
                project.end_date,
                project.funding_amount,
                project.currency.as_str(),
                project.status.as_str(),
                project.funder_id.to_string(),
                project.pi_user_id.map(|id| id.to_string()),
                project.created_at,
                project.updated_at,
            ],
        )?;
        let linked = link_tags(&tx, project.id, tag_ids)?;
        tx.commit()?;

        debug!(
            "event=project_create module=repo status=ok id={} tag_links={}",
            project.id, linked
        );
        Ok(project.id)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_project_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(funder_id) = query.funder_id {
            sql.push_str(" AND funder_id = ?");
            bind_values.push(Value::Text(funder_id.to_string()));
        }
        if let Some(pi_user_id) = query.pi_user_id {
            sql.push_str(" AND pi_user_id = ?");
            bind_values.push(Value::Text(pi_user_id.to_string()));
        }
        if let Some(tag_id) = query.tag_id {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM project_tags pt
                    WHERE pt.project_id = projects.id
                      AND pt.tag_id = ?
                )",
            );
            bind_values.push(Value::Text(tag_id.to_string()));
        }

        sql.push_str(" ORDER BY start_date DESC, title COLLATE NOCASE ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Project, project.id)?;
        ensure_project_references(&tx, project)?;
        tx.execute(
            "UPDATE projects
             SET
                title = ?2,
                summary = ?3,
                description = ?4,
                start_date = ?5,
                end_date = ?6,
                funding_amount = ?7,
                currency = ?8,
                status = ?9,
                funder_id = ?10,
                pi_user_id = ?11,
                updated_at = ?12
             WHERE id = ?1;",
            params![
                project.id.to_string(),
                project.title.as_str(),
                project.summary.as_str(),
                project.description.as_deref(),
                project.start_date,
                project.end_date,
                project.funding_amount,
                project.currency.as_str(),
                project.status.as_str(),
                project.funder_id.to_string(),
                project.pi_user_id.map(|id| id.to_string()),
                now_epoch_ms(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        delete_row(self.conn, EntityKind::Project, id)?;
        debug!("event=project_delete module=repo status=ok id={id}");
        Ok(())
    }
}

fn ensure_project_references(conn: &Connection, project: &Project) -> RepoResult<()> {
    ensure_exists(conn, EntityKind::Funder, project.funder_id)?;
    if let Some(pi_user_id) = project.pi_user_id {
        ensure_exists(conn, EntityKind::User, pi_user_id)?;
    }
    Ok(())
}

fn parse_funder_row(row: &Row<'_>) -> RepoResult<Funder> {
    let id: String = row.get("id")?;
    let funder = Funder {
        id: parse_uuid(&id, "funders.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        website: row.get("website")?,
        country: row.get("country")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    funder
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("funder {}: {err}", funder.id)))?;
    Ok(funder)
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id: String = row.get("id")?;
    let funder_id: String = row.get("funder_id")?;
    let status: String = row.get("status")?;
    let project = Project {
        id: parse_uuid(&id, "projects.id")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        funding_amount: row.get("funding_amount")?,
        currency: row.get("currency")?,
        status: parse_column(&status, "projects.status", str::parse::<ProjectStatus>)?,
        funder_id: parse_uuid(&funder_id, "projects.funder_id")?,
        pi_user_id: parse_optional_uuid(row.get("pi_user_id")?, "projects.pi_user_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    project
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("project {}: {err}", project.id)))?;
    Ok(project)
}
