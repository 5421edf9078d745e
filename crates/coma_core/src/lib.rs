//! Domain store for the COMA research-collaboration platform.
//!
//! The crate owns the relational model (users, funders, projects, tags,
//! community content), enforces its referential-integrity contract on top of
//! SQLite, and ships the seed driver that bulk-loads a dataset in dependency
//! order.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod store;

pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::{parse_date, EntityKind, ValidationError};
pub use repo::community_repo::{CommunityRepository, SqliteCommunityRepository};
pub use repo::funding_repo::{FundingRepository, ProjectListQuery, SqliteFundingRepository};
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{ConflictError, ErrorKind, RepoError, RepoResult};
pub use seed::dataset::Dataset;
pub use seed::{SeedError, SeedOptions, SeedSummary};
pub use store::{Store, StoreTarget};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
