//! User/profile repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist users and their optional 1:1 profiles.
//! - Enforce email uniqueness and the one-profile-per-user rule.
//!
//! # Invariants
//! - Deleting a user cascades its profile and clears `projects.pi_user_id`.
//! - Deleting a user is refused while it authors posts, comments or
//!   annotations.
//! - `Profile.user_id` never changes after creation.

use crate::model::user::{normalize_email, Profile, ProfileId, User, UserId, UserRole};
use crate::model::{now_epoch_ms, EntityKind, ValidationError};
use crate::repo::{
    delete_row, ensure_exists, ensure_unreferenced, is_unique_violation, parse_column,
    parse_uuid, ConflictError, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    role,
    affiliation,
    created_at,
    updated_at
FROM users";

const PROFILE_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    bio,
    orcid_id,
    avatar_url,
    research_areas,
    created_at,
    updated_at
FROM profiles";

/// Repository interface for users and profiles.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    /// Creates a user and its profile in one transaction.
    fn create_user_with_profile(&self, user: &User, profile: &Profile) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Lists users ordered by name, optionally filtered by role.
    fn list_users(&self, role: Option<UserRole>) -> RepoResult<Vec<User>>;
    /// Replaces name, email, role and affiliation.
    fn update_user(&self, user: &User) -> RepoResult<()>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;

    /// Creates the profile for `profile.user_id`.
    fn create_profile(&self, profile: &Profile) -> RepoResult<ProfileId>;
    fn get_profile(&self, id: ProfileId) -> RepoResult<Option<Profile>>;
    fn profile_for_user(&self, user_id: UserId) -> RepoResult<Option<Profile>>;
    /// Replaces bio, ORCID, avatar and research areas.
    fn update_profile(&self, profile: &Profile) -> RepoResult<()>;
    fn delete_profile(&self, id: ProfileId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        insert_user(&tx, user)?;
        tx.commit()?;

        debug!("event=user_create module=repo status=ok id={}", user.id);
        Ok(user.id)
    }

    fn create_user_with_profile(&self, user: &User, profile: &Profile) -> RepoResult<UserId> {
        user.validate()?;
        profile.validate()?;
        if profile.user_id != user.id {
            return Err(ValidationError::ProfileOwnerMismatch {
                profile_user_id: profile.user_id,
                user_id: user.id,
            }
            .into());
        }

        let tx = self.conn.unchecked_transaction()?;
        insert_user(&tx, user)?;
        insert_profile(&tx, profile)?;
        tx.commit()?;

        debug!(
            "event=user_create module=repo status=ok id={} with_profile=true",
            user.id
        );
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([normalize_email(email)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_users(&self, role: Option<UserRole>) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL}
             WHERE (?1 IS NULL OR role = ?1)
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([role.map(UserRole::as_str)])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        let email = normalize_email(&user.email);
        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::User, user.id)?;
        ensure_email_free(&tx, &email, Some(user.id))?;
        tx.execute(
            "UPDATE users
             SET
                name = ?2,
                email = ?3,
                role = ?4,
                affiliation = ?5,
                updated_at = ?6
             WHERE id = ?1;",
            params![
                user.id.to_string(),
                user.name.as_str(),
                email.as_str(),
                user.role.as_str(),
                user.affiliation.as_deref(),
                now_epoch_ms(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::User, id)?;
        ensure_unreferenced(&tx, EntityKind::User, id, EntityKind::Post, "author_id")?;
        ensure_unreferenced(&tx, EntityKind::User, id, EntityKind::Comment, "author_id")?;
        ensure_unreferenced(&tx, EntityKind::User, id, EntityKind::Annotation, "user_id")?;
        delete_row(&tx, EntityKind::User, id)?;
        tx.commit()?;

        debug!("event=user_delete module=repo status=ok id={id}");
        Ok(())
    }

    fn create_profile(&self, profile: &Profile) -> RepoResult<ProfileId> {
        profile.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::User, profile.user_id)?;
        insert_profile(&tx, profile)?;
        tx.commit()?;
        Ok(profile.id)
    }

    fn get_profile(&self, id: ProfileId) -> RepoResult<Option<Profile>> {
        query_profile(self.conn, "id", &id.to_string())
    }

    fn profile_for_user(&self, user_id: UserId) -> RepoResult<Option<Profile>> {
        query_profile(self.conn, "user_id", &user_id.to_string())
    }

    fn update_profile(&self, profile: &Profile) -> RepoResult<()> {
        profile.validate()?;

        let changed = self.conn.execute(
            "UPDATE profiles
             SET
                bio = ?2,
                orcid_id = ?3,
                avatar_url = ?4,
                research_areas = ?5,
                updated_at = ?6
             WHERE id = ?1;",
            params![
                profile.id.to_string(),
                profile.bio.as_deref(),
                profile.orcid_id.as_deref(),
                profile.avatar_url.as_deref(),
                encode_research_areas(&profile.research_areas)?,
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Profile, profile.id));
        }
        Ok(())
    }

    fn delete_profile(&self, id: ProfileId) -> RepoResult<()> {
        delete_row(self.conn, EntityKind::Profile, id)
    }
}

fn insert_user(conn: &Connection, user: &User) -> RepoResult<()> {
    let email = normalize_email(&user.email);
    ensure_email_free(conn, &email, None)?;
    conn.execute(
        "INSERT INTO users (
            id,
            name,
            email,
            role,
            affiliation,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            user.id.to_string(),
            user.name.as_str(),
            email.as_str(),
            user.role.as_str(),
            user.affiliation.as_deref(),
            user.created_at,
            user.updated_at,
        ],
    )
    .map_err(|err| {
        if is_unique_violation(&err) {
            RepoError::Conflict(ConflictError::EmailInUse(email.clone()))
        } else {
            RepoError::from(err)
        }
    })?;
    Ok(())
}

fn insert_profile(conn: &Connection, profile: &Profile) -> RepoResult<()> {
    let taken: Option<String> = conn
        .query_row(
            "SELECT id FROM profiles WHERE user_id = ?1;",
            [profile.user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(ConflictError::ProfileExists(profile.user_id).into());
    }

    conn.execute(
        "INSERT INTO profiles (
            id,
            user_id,
            bio,
            orcid_id,
            avatar_url,
            research_areas,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            profile.id.to_string(),
            profile.user_id.to_string(),
            profile.bio.as_deref(),
            profile.orcid_id.as_deref(),
            profile.avatar_url.as_deref(),
            encode_research_areas(&profile.research_areas)?,
            profile.created_at,
            profile.updated_at,
        ],
    )?;
    Ok(())
}

/// Fails with `EmailInUse` when another user (other than `except`) owns `email`.
fn ensure_email_free(conn: &Connection, email: &str, except: Option<UserId>) -> RepoResult<()> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1 COLLATE NOCASE;",
            [email],
            |row| row.get(0),
        )
        .optional()?;
    let Some(owner) = owner else {
        return Ok(());
    };
    if except.is_some_and(|id| id.to_string() == owner) {
        return Ok(());
    }
    Err(ConflictError::EmailInUse(email.to_string()).into())
}

fn query_profile(conn: &Connection, column: &str, value: &str) -> RepoResult<Option<Profile>> {
    let mut stmt = conn.prepare(&format!("{PROFILE_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([value])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_profile_row(row)?)),
        None => Ok(None),
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: String = row.get("id")?;
    let role: String = row.get("role")?;
    let user = User {
        id: parse_uuid(&id, "users.id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        role: parse_column(&role, "users.role", str::parse::<UserRole>)?,
        affiliation: row.get("affiliation")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    user.validate()
        .map_err(|err| RepoError::InvalidData(format!("user {}: {err}", user.id)))?;
    Ok(user)
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<Profile> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let areas: String = row.get("research_areas")?;
    let profile = Profile {
        id: parse_uuid(&id, "profiles.id")?,
        user_id: parse_uuid(&user_id, "profiles.user_id")?,
        bio: row.get("bio")?,
        orcid_id: row.get("orcid_id")?,
        avatar_url: row.get("avatar_url")?,
        research_areas: serde_json::from_str(&areas).map_err(|err| {
            RepoError::InvalidData(format!("invalid profiles.research_areas `{areas}`: {err}"))
        })?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    profile
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("profile {}: {err}", profile.id)))?;
    Ok(profile)
}

fn encode_research_areas(areas: &[String]) -> RepoResult<String> {
    serde_json::to_string(areas)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode research areas: {err}")))
}
