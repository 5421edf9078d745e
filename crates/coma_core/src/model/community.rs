//! Discussion spaces, posts, comments and project annotations.
//!
//! # Invariants
//! - A post belongs to exactly one space and one author.
//! - A comment belongs to exactly one post and one author.
//! - An annotation belongs to exactly one project and one author.
//! - Container and author references are fixed at creation.

use super::funding::ProjectId;
use super::user::UserId;
use super::{now_epoch_ms, require_text, unknown_variant, EntityKind, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type SpaceId = Uuid;
pub type PostId = Uuid;
pub type CommentId = Uuid;
pub type AnnotationId = Uuid;

/// Who can see a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        }
    }
}

impl FromStr for Visibility {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PUBLIC" => Ok(Self::Public),
            "PRIVATE" => Ok(Self::Private),
            other => Err(unknown_variant("space visibility", other)),
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topical discussion forum holding posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Space {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            visibility: Visibility::Public,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Space, "name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub space_id: SpaceId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Post {
    pub fn new(
        space_id: SpaceId,
        author_id: UserId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            space_id,
            author_id,
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Post, "title", &self.title)?;
        require_text(EntityKind::Post, "content", &self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Comment {
    pub fn new(post_id: PostId, author_id: UserId, content: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Comment, "content", &self.content)
    }
}

/// Reviewer or funder note attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub content: String,
    /// Free-text reviewer label such as `High Impact`.
    pub category: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Annotation {
    pub fn new(
        project_id: ProjectId,
        user_id: UserId,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            content: content.into(),
            category: category.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Annotation, "content", &self.content)?;
        require_text(EntityKind::Annotation, "category", &self.category)
    }
}
