//! User and profile domain model.
//!
//! # Invariants
//! - `email` is stored trimmed and lowercase; uniqueness is case-insensitive.
//! - A profile belongs to exactly one user and lives and dies with it.
//! - Research-area labels form a set: no blanks, no duplicates.

use super::{now_epoch_ms, require_text, unknown_variant, EntityKind, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub type UserId = Uuid;
pub type ProfileId = Uuid;

/// Platform role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Guest,
    Researcher,
    Funder,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::Researcher => "RESEARCHER",
            Self::Funder => "FUNDER",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GUEST" => Ok(Self::Guest),
            "RESEARCHER" => Ok(Self::Researcher),
            "FUNDER" => Ok(Self::Funder),
            "ADMIN" => Ok(Self::Admin),
            other => Err(unknown_variant("user role", other)),
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account record for researchers, funders and admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub affiliation: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Creates a new user with a generated id and normalized email.
    pub fn new(name: impl Into<String>, email: &str, role: UserRole) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: normalize_email(email),
            role,
            affiliation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::User, "name", &self.name)?;
        if !EMAIL_RE.is_match(&normalize_email(&self.email)) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Normalizes an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Researcher profile attached 1:1 to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub bio: Option<String>,
    /// ORCID researcher identifier, stored opaquely.
    pub orcid_id: Option<String>,
    pub avatar_url: Option<String>,
    pub research_areas: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Profile {
    /// Creates an empty profile for `user_id`.
    pub fn new(user_id: UserId) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            user_id,
            bio: None,
            orcid_id: None,
            avatar_url: None,
            research_areas: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces research areas with the trimmed, deduplicated input.
    ///
    /// First occurrence wins; blank labels are kept so `validate` reports them.
    pub fn set_research_areas<I, S>(&mut self, areas: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        self.research_areas = areas
            .into_iter()
            .map(|area| area.as_ref().trim().to_string())
            .filter(|area| area.is_empty() || seen.insert(area.to_lowercase()))
            .collect();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for area in &self.research_areas {
            if area.trim().is_empty() {
                return Err(ValidationError::BlankResearchArea);
            }
            if !seen.insert(area.trim().to_lowercase()) {
                return Err(ValidationError::DuplicateResearchArea(area.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Profile, User, UserRole};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn new_user_normalizes_email() {
        let user = User::new("Anna", "  Anna.Schmidt@Example.COM ", UserRole::Researcher);
        assert_eq!(user.email, "anna.schmidt@example.com");
        assert_eq!(user.created_at, user.updated_at);
        user.validate().expect("normalized user should validate");
    }

    #[test]
    fn validate_checks_the_normalized_email() {
        let mut user = User::new("Ben", "ben@example.com", UserRole::Researcher);
        user.email = " B@Example.com".to_string();
        user.validate().expect("padded email should validate");

        user.email = " not an email ".to_string();
        assert!(matches!(
            user.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn validate_rejects_malformed_email() {
        let user = User::new("Anna", "anna-at-example", UserRole::Guest);
        assert!(matches!(
            user.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn role_parses_only_known_values() {
        assert_eq!("FUNDER".parse::<UserRole>().unwrap(), UserRole::Funder);
        assert!("funder".parse::<UserRole>().is_err());
    }

    #[test]
    fn research_areas_are_deduplicated_case_insensitively() {
        let mut profile = Profile::new(Uuid::new_v4());
        profile.set_research_areas(["AI", " ai ", "Healthcare"]);
        assert_eq!(profile.research_areas, vec!["AI", "Healthcare"]);
        profile.validate().expect("deduplicated areas should validate");
    }

    #[test]
    fn blank_research_area_is_rejected() {
        let mut profile = Profile::new(Uuid::new_v4());
        profile.set_research_areas(["AI", "  "]);
        assert_eq!(profile.validate(), Err(ValidationError::BlankResearchArea));
    }
}
