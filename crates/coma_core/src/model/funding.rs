//! Funder and project domain model.
//!
//! # Invariants
//! - A project always references exactly one funder.
//! - `end_date`, when set, is not before `start_date`.
//! - `funding_amount` is finite and non-negative.
//! - `currency` is a three-letter uppercase code (ISO-4217 shape).

use super::user::UserId;
use super::{now_epoch_ms, require_text, unknown_variant, EntityKind, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type FunderId = Uuid;
pub type ProjectId = Uuid;

/// Funding organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Funder {
    pub id: FunderId,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub country: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Funder {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            website: None,
            country: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Funder, "name", &self.name)
    }
}

/// Lifecycle state of a funded project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planned,
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PLANNED" => Ok(Self::Planned),
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(unknown_variant("project status", other)),
        }
    }
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Funded research project.
///
/// Tags are not stored on the record; they live in the association index
/// (`repo::tag_repo`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub summary: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub funding_amount: f64,
    pub currency: String,
    pub status: ProjectStatus,
    pub funder_id: FunderId,
    /// Principal investigator.
    pub pi_user_id: Option<UserId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Project {
    /// Creates a planned project with zero funding in EUR.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        funder_id: FunderId,
        start_date: NaiveDate,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            summary: summary.into(),
            description: None,
            start_date,
            end_date: None,
            funding_amount: 0.0,
            currency: "EUR".to_string(),
            status: ProjectStatus::Planned,
            funder_id,
            pi_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(EntityKind::Project, "title", &self.title)?;
        require_text(EntityKind::Project, "summary", &self.summary)?;
        if !self.funding_amount.is_finite() || self.funding_amount < 0.0 {
            return Err(ValidationError::InvalidFundingAmount(self.funding_amount));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ValidationError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }
        if !is_currency_code(&self.currency) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }
}

fn is_currency_code(value: &str) -> bool {
    value.len() == 3 && value.bytes().all(|byte| byte.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::{Funder, Project, ProjectStatus};
    use crate::model::{parse_date, ValidationError};

    fn project() -> Project {
        let funder = Funder::new("FFG");
        Project::new(
            "Alpine energy",
            "Solar and wind",
            funder.id,
            parse_date("2022-01-01").unwrap(),
        )
    }

    #[test]
    fn end_date_on_start_date_is_accepted() {
        let mut project = project();
        project.end_date = Some(project.start_date);
        project.validate().expect("same-day range is valid");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut project = project();
        project.end_date = Some(parse_date("2021-12-31").unwrap());
        assert!(matches!(
            project.validate(),
            Err(ValidationError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn negative_and_nan_funding_are_rejected() {
        let mut project = project();
        project.funding_amount = -1.0;
        assert!(matches!(
            project.validate(),
            Err(ValidationError::InvalidFundingAmount(_))
        ));
        project.funding_amount = f64::NAN;
        assert!(project.validate().is_err());
        project.funding_amount = 0.0;
        project.validate().expect("zero funding is allowed");
    }

    #[test]
    fn currency_must_be_uppercase_triplet() {
        let mut project = project();
        project.currency = "eur".to_string();
        assert_eq!(
            project.validate(),
            Err(ValidationError::InvalidCurrency("eur".to_string()))
        );
        project.currency = "CHF".to_string();
        project.validate().expect("CHF is valid");
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ProjectStatus::Planned,
            ProjectStatus::Active,
            ProjectStatus::Completed,
            ProjectStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<ProjectStatus>().unwrap(), status);
        }
    }
}
