//! Community repository: spaces, posts, comments and project annotations.
//!
//! # Responsibility
//! - Persist user-authored discussion content and project annotations.
//! - Resolve container and author references before any row is written.
//!
//! # Invariants
//! - Posts require an existing space and author; comments an existing post
//!   and author; annotations an existing project and author.
//! - Deleting a space is refused while it holds posts.
//! - Deleting a post cascades its comments.
//! - Container/author references are immutable; updates only touch text.

use crate::model::community::{
    Annotation, AnnotationId, Comment, CommentId, Post, PostId, Space, SpaceId, Visibility,
};
use crate::model::funding::ProjectId;
use crate::model::{now_epoch_ms, EntityKind};
use crate::repo::{
    delete_row, ensure_exists, ensure_unreferenced, parse_column, parse_uuid, RepoError,
    RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const SPACE_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    visibility,
    created_at,
    updated_at
FROM spaces";

const POST_SELECT_SQL: &str = "SELECT
    id,
    space_id,
    author_id,
    title,
    content,
    created_at,
    updated_at
FROM posts";

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    post_id,
    author_id,
    content,
    created_at,
    updated_at
FROM comments";

const ANNOTATION_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    user_id,
    content,
    category,
    created_at,
    updated_at
FROM annotations";

/// Repository interface for spaces, posts, comments and annotations.
pub trait CommunityRepository {
    fn create_space(&self, space: &Space) -> RepoResult<SpaceId>;
    fn get_space(&self, id: SpaceId) -> RepoResult<Option<Space>>;
    /// Lists spaces ordered by name, optionally filtered by visibility.
    fn list_spaces(&self, visibility: Option<Visibility>) -> RepoResult<Vec<Space>>;
    /// Replaces name, description and visibility.
    fn update_space(&self, space: &Space) -> RepoResult<()>;
    fn delete_space(&self, id: SpaceId) -> RepoResult<()>;

    fn create_post(&self, post: &Post) -> RepoResult<PostId>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>>;
    /// Posts of one space, oldest first.
    fn list_posts_in_space(&self, space_id: SpaceId) -> RepoResult<Vec<Post>>;
    /// Replaces title and content.
    fn update_post(&self, post: &Post) -> RepoResult<()>;
    fn delete_post(&self, id: PostId) -> RepoResult<()>;

    fn create_comment(&self, comment: &Comment) -> RepoResult<CommentId>;
    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>>;
    /// Comments on one post, oldest first.
    fn list_comments_on_post(&self, post_id: PostId) -> RepoResult<Vec<Comment>>;
    /// Replaces content.
    fn update_comment(&self, comment: &Comment) -> RepoResult<()>;
    fn delete_comment(&self, id: CommentId) -> RepoResult<()>;

    fn create_annotation(&self, annotation: &Annotation) -> RepoResult<AnnotationId>;
    fn get_annotation(&self, id: AnnotationId) -> RepoResult<Option<Annotation>>;
    /// Annotations on one project, oldest first.
    fn list_annotations_for_project(&self, project_id: ProjectId)
        -> RepoResult<Vec<Annotation>>;
    /// Replaces content and category.
    fn update_annotation(&self, annotation: &Annotation) -> RepoResult<()>;
    fn delete_annotation(&self, id: AnnotationId) -> RepoResult<()>;
}

/// SQLite-backed community repository.
pub struct SqliteCommunityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommunityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CommunityRepository for SqliteCommunityRepository<'_> {
    fn create_space(&self, space: &Space) -> RepoResult<SpaceId> {
        space.validate()?;

        self.conn.execute(
            "INSERT INTO spaces (
                id,
                name,
                description,
                visibility,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                space.id.to_string(),
                space.name.as_str(),
                space.description.as_str(),
                space.visibility.as_str(),
                space.created_at,
                space.updated_at,
            ],
        )?;
        Ok(space.id)
    }

    fn get_space(&self, id: SpaceId) -> RepoResult<Option<Space>> {
        query_one(self.conn, SPACE_SELECT_SQL, id, parse_space_row)
    }

    fn list_spaces(&self, visibility: Option<Visibility>) -> RepoResult<Vec<Space>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SPACE_SELECT_SQL}
             WHERE (?1 IS NULL OR visibility = ?1)
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([visibility.map(Visibility::as_str)])?;
        let mut spaces = Vec::new();
        while let Some(row) = rows.next()? {
            spaces.push(parse_space_row(row)?);
        }
        Ok(spaces)
    }

    fn update_space(&self, space: &Space) -> RepoResult<()> {
        space.validate()?;

        let changed = self.conn.execute(
            "UPDATE spaces
             SET
                name = ?2,
                description = ?3,
                visibility = ?4,
                updated_at = ?5
             WHERE id = ?1;",
            params![
                space.id.to_string(),
                space.name.as_str(),
                space.description.as_str(),
                space.visibility.as_str(),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Space, space.id));
        }
        Ok(())
    }

    fn delete_space(&self, id: SpaceId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Space, id)?;
        ensure_unreferenced(&tx, EntityKind::Space, id, EntityKind::Post, "space_id")?;
        delete_row(&tx, EntityKind::Space, id)?;
        tx.commit()?;
        Ok(())
    }

    fn create_post(&self, post: &Post) -> RepoResult<PostId> {
        post.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Space, post.space_id)?;
        ensure_exists(&tx, EntityKind::User, post.author_id)?;
        tx.execute(
            "INSERT INTO posts (
                id,
                space_id,
                author_id,
                title,
                content,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                post.id.to_string(),
                post.space_id.to_string(),
                post.author_id.to_string(),
                post.title.as_str(),
                post.content.as_str(),
                post.created_at,
                post.updated_at,
            ],
        )?;
        tx.commit()?;

        debug!(
            "event=post_create module=repo status=ok id={} space_id={}",
            post.id, post.space_id
        );
        Ok(post.id)
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>> {
        query_one(self.conn, POST_SELECT_SQL, id, parse_post_row)
    }

    fn list_posts_in_space(&self, space_id: SpaceId) -> RepoResult<Vec<Post>> {
        query_children(self.conn, POST_SELECT_SQL, "space_id", space_id, parse_post_row)
    }

    fn update_post(&self, post: &Post) -> RepoResult<()> {
        post.validate()?;

        let changed = self.conn.execute(
            "UPDATE posts SET title = ?2, content = ?3, updated_at = ?4 WHERE id = ?1;",
            params![
                post.id.to_string(),
                post.title.as_str(),
                post.content.as_str(),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Post, post.id));
        }
        Ok(())
    }

    fn delete_post(&self, id: PostId) -> RepoResult<()> {
        delete_row(self.conn, EntityKind::Post, id)
    }

    fn create_comment(&self, comment: &Comment) -> RepoResult<CommentId> {
        comment.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Post, comment.post_id)?;
        ensure_exists(&tx, EntityKind::User, comment.author_id)?;
        tx.execute(
            "INSERT INTO comments (
                id,
                post_id,
                author_id,
                content,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                comment.id.to_string(),
                comment.post_id.to_string(),
                comment.author_id.to_string(),
                comment.content.as_str(),
                comment.created_at,
                comment.updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(comment.id)
    }

    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        query_one(self.conn, COMMENT_SELECT_SQL, id, parse_comment_row)
    }

    fn list_comments_on_post(&self, post_id: PostId) -> RepoResult<Vec<Comment>> {
        query_children(
            self.conn,
            COMMENT_SELECT_SQL,
            "post_id",
            post_id,
            parse_comment_row,
        )
    }

    fn update_comment(&self, comment: &Comment) -> RepoResult<()> {
        comment.validate()?;

        let changed = self.conn.execute(
            "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1;",
            params![
                comment.id.to_string(),
                comment.content.as_str(),
                now_epoch_ms()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Comment, comment.id));
        }
        Ok(())
    }

    fn delete_comment(&self, id: CommentId) -> RepoResult<()> {
        delete_row(self.conn, EntityKind::Comment, id)
    }

    fn create_annotation(&self, annotation: &Annotation) -> RepoResult<AnnotationId> {
        annotation.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        ensure_exists(&tx, EntityKind::Project, annotation.project_id)?;
        ensure_exists(&tx, EntityKind::User, annotation.user_id)?;
        tx.execute(
            "INSERT INTO annotations (
                id,
                project_id,
                user_id,
                content,
                category,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                annotation.id.to_string(),
                annotation.project_id.to_string(),
                annotation.user_id.to_string(),
                annotation.content.as_str(),
                annotation.category.as_str(),
                annotation.created_at,
                annotation.updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(annotation.id)
    }

    fn get_annotation(&self, id: AnnotationId) -> RepoResult<Option<Annotation>> {
        query_one(self.conn, ANNOTATION_SELECT_SQL, id, parse_annotation_row)
    }

    fn list_annotations_for_project(
        &self,
        project_id: ProjectId,
    ) -> RepoResult<Vec<Annotation>> {
        query_children(
            self.conn,
            ANNOTATION_SELECT_SQL,
            "project_id",
            project_id,
            parse_annotation_row,
        )
    }

    fn update_annotation(&self, annotation: &Annotation) -> RepoResult<()> {
        annotation.validate()?;

        let changed = self.conn.execute(
            "UPDATE annotations SET content = ?2, category = ?3, updated_at = ?4 WHERE id = ?1;",
            params![
                annotation.id.to_string(),
                annotation.content.as_str(),
                annotation.category.as_str(),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Annotation, annotation.id));
        }
        Ok(())
    }

    fn delete_annotation(&self, id: AnnotationId) -> RepoResult<()> {
        delete_row(self.conn, EntityKind::Annotation, id)
    }
}

fn query_one<T>(
    conn: &Connection,
    select_sql: &str,
    id: Uuid,
    parse: fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Option<T>> {
    let mut stmt = conn.prepare(&format!("{select_sql} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse(row)?)),
        None => Ok(None),
    }
}

fn query_children<T>(
    conn: &Connection,
    select_sql: &str,
    parent_column: &str,
    parent_id: Uuid,
    parse: fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(&format!(
        "{select_sql} WHERE {parent_column} = ?1 ORDER BY created_at ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([parent_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse(row)?);
    }
    Ok(items)
}

fn parse_space_row(row: &Row<'_>) -> RepoResult<Space> {
    let id: String = row.get("id")?;
    let visibility: String = row.get("visibility")?;
    let space = Space {
        id: parse_uuid(&id, "spaces.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        visibility: parse_column(&visibility, "spaces.visibility", str::parse::<Visibility>)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    space
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("space {}: {err}", space.id)))?;
    Ok(space)
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<Post> {
    let id: String = row.get("id")?;
    let space_id: String = row.get("space_id")?;
    let author_id: String = row.get("author_id")?;
    let post = Post {
        id: parse_uuid(&id, "posts.id")?,
        space_id: parse_uuid(&space_id, "posts.space_id")?,
        author_id: parse_uuid(&author_id, "posts.author_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    post.validate()
        .map_err(|err| RepoError::InvalidData(format!("post {}: {err}", post.id)))?;
    Ok(post)
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let id: String = row.get("id")?;
    let post_id: String = row.get("post_id")?;
    let author_id: String = row.get("author_id")?;
    let comment = Comment {
        id: parse_uuid(&id, "comments.id")?,
        post_id: parse_uuid(&post_id, "comments.post_id")?,
        author_id: parse_uuid(&author_id, "comments.author_id")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    comment
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("comment {}: {err}", comment.id)))?;
    Ok(comment)
}

fn parse_annotation_row(row: &Row<'_>) -> RepoResult<Annotation> {
    let id: String = row.get("id")?;
    let project_id: String = row.get("project_id")?;
    let user_id: String = row.get("user_id")?;
    let annotation = Annotation {
        id: parse_uuid(&id, "annotations.id")?,
        project_id: parse_uuid(&project_id, "annotations.project_id")?,
        user_id: parse_uuid(&user_id, "annotations.user_id")?,
        content: row.get("content")?,
        category: row.get("category")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    annotation
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("annotation {}: {err}", annotation.id)))?;
    Ok(annotation)
}
