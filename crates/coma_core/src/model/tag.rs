//! Tag domain model.
//!
//! Tags are shared vocabulary: they are linked to projects through the
//! association index and outlive every project that references them.

use super::{now_epoch_ms, require_text, EntityKind, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TagId = Uuid;

/// Project classification label. `name` is unique case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub category: Option<String>,
    pub created_at: i64,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            category: None,
            created_at: now_epoch_ms(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Tag, "name", &self.name)
    }
}
