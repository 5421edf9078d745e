//! Domain model for the COMA research-collaboration store.
//!
//! # Responsibility
//! - Define the canonical entities persisted by the domain store.
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that is never reused.
//! - Enumerated fields are closed variants; unknown strings are rejected.
//! - `validate()` never touches storage; cross-row rules live in `repo`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod community;
pub mod funding;
pub mod tag;
pub mod user;

/// Every persisted entity type, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Profile,
    Funder,
    Tag,
    Project,
    Space,
    Post,
    Comment,
    Annotation,
}

impl EntityKind {
    /// All kinds in declaration order.
    pub const ALL: [EntityKind; 9] = [
        Self::User,
        Self::Profile,
        Self::Funder,
        Self::Tag,
        Self::Project,
        Self::Space,
        Self::Post,
        Self::Comment,
        Self::Annotation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Profile => "profile",
            Self::Funder => "funder",
            Self::Tag => "tag",
            Self::Project => "project",
            Self::Space => "space",
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Annotation => "annotation",
        }
    }

    /// Backing SQLite table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Profile => "profiles",
            Self::Funder => "funders",
            Self::Tag => "tags",
            Self::Project => "projects",
            Self::Space => "spaces",
            Self::Post => "posts",
            Self::Comment => "comments",
            Self::Annotation => "annotations",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation failure raised before any write reaches storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    BlankField {
        entity: EntityKind,
        field: &'static str,
    },
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// Funding amount is negative or not a finite number.
    InvalidFundingAmount(f64),
    /// Project end date precedes its start date.
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    /// Currency is not a three-letter uppercase code.
    InvalidCurrency(String),
    /// Calendar date text is not `YYYY-MM-DD`.
    InvalidDate(String),
    /// Enumerated field received a value outside its closed set.
    UnknownVariant { field: &'static str, value: String },
    /// Research-area label is blank.
    BlankResearchArea,
    /// Research-area label appears more than once.
    DuplicateResearchArea(String),
    /// Profile handed in with a user belongs to a different user.
    ProfileOwnerMismatch { profile_user_id: Uuid, user_id: Uuid },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { entity, field } => {
                write!(f, "{entity}.{field} must not be blank")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::InvalidFundingAmount(value) => {
                write!(f, "funding amount must be a non-negative number, got {value}")
            }
            Self::EndBeforeStart { start, end } => {
                write!(f, "project end date {end} is before start date {start}")
            }
            Self::InvalidCurrency(value) => {
                write!(f, "currency must be a three-letter uppercase code, got `{value}`")
            }
            Self::InvalidDate(value) => write!(f, "invalid calendar date `{value}`"),
            Self::UnknownVariant { field, value } => {
                write!(f, "unknown {field} value `{value}`")
            }
            Self::BlankResearchArea => write!(f, "research area labels must not be blank"),
            Self::DuplicateResearchArea(value) => {
                write!(f, "duplicate research area label `{value}`")
            }
            Self::ProfileOwnerMismatch {
                profile_user_id,
                user_id,
            } => write!(
                f,
                "profile belongs to user {profile_user_id}, not to user {user_id}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Parses an ISO `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn require_text(
    entity: EntityKind,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField { entity, field });
    }
    Ok(())
}

pub(crate) fn unknown_variant(field: &'static str, value: &str) -> ValidationError {
    ValidationError::UnknownVariant {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_date, require_text, EntityKind, ValidationError};

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        let date = parse_date("2022-01-01").expect("iso date should parse");
        assert_eq!(date.to_string(), "2022-01-01");

        let err = parse_date("01/02/2022").expect_err("non-iso date must fail");
        assert!(matches!(err, ValidationError::InvalidDate(_)));
    }

    #[test]
    fn require_text_rejects_whitespace() {
        let err = require_text(EntityKind::Post, "title", "   ").unwrap_err();
        assert_eq!(err.to_string(), "post.title must not be blank");
    }

    #[test]
    fn entity_kinds_map_to_distinct_tables() {
        let mut tables: Vec<_> = EntityKind::ALL.iter().map(|kind| kind.table()).collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), EntityKind::ALL.len());
    }
}
