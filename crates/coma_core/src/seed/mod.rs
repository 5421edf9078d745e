//! Seed/bulk-load driver.
//!
//! # Responsibility
//! - Populate a store with a dataset in one pass, walking the explicit
//!   dependency plan instead of relying on call-site ordering.
//! - Report how many rows of each kind were created.
//!
//! # Invariants
//! - Kinds are cleared in `plan::clear_order()` and created in
//!   `plan::load_order()`.
//! - The first failure aborts the load; nothing after it is attempted.
//! - `run` releases the store on success and on failure.

use crate::db::DbError;
use crate::model::community::{Annotation, Comment, Post, Space};
use crate::model::funding::{Funder, Project};
use crate::model::parse_date;
use crate::model::tag::Tag;
use crate::model::user::{Profile, User};
use crate::model::EntityKind;
use crate::repo::community_repo::CommunityRepository;
use crate::repo::funding_repo::FundingRepository;
use crate::repo::tag_repo::TagRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::store::{Store, StoreTarget};
use log::{error, info};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub mod dataset;
pub mod plan;

use dataset::Dataset;
use plan::{clear_order, load_order, PlanError};

/// Bulk-load behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
    /// Delete every existing row before loading.
    pub clear_existing: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            clear_existing: true,
        }
    }
}

/// Rows created per entity kind by one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    counts: BTreeMap<EntityKind, usize>,
    /// Tag/project association rows created.
    pub tag_links: usize,
    /// Rows removed while clearing existing data.
    pub cleared: usize,
}

impl SeedSummary {
    pub fn count(&self, kind: EntityKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn record(&mut self, kind: EntityKind, created: usize) {
        *self.counts.entry(kind).or_insert(0) += created;
    }
}

impl Display for SeedSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Summary:")?;
        for kind in EntityKind::ALL {
            writeln!(f, "- {} {}", self.count(kind), kind.table())?;
        }
        write!(f, "- {} tag links", self.tag_links)
    }
}

/// Failure that aborted a bulk load.
#[derive(Debug)]
pub enum SeedError {
    Open(DbError),
    Close(DbError),
    Plan(PlanError),
    /// Clearing existing rows of `kind` failed.
    Clear { kind: EntityKind, source: RepoError },
    /// Creating row `index` of `kind` failed.
    Step {
        kind: EntityKind,
        index: usize,
        source: RepoError,
    },
    /// Row `index` of `kind` points at a `target` position the dataset lacks.
    UnresolvedReference {
        kind: EntityKind,
        index: usize,
        target: EntityKind,
        position: usize,
    },
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "failed to open store: {err}"),
            Self::Close(err) => write!(f, "failed to close store: {err}"),
            Self::Plan(err) => write!(f, "invalid load plan: {err}"),
            Self::Clear { kind, source } => write!(f, "failed to clear {kind} rows: {source}"),
            Self::Step {
                kind,
                index,
                source,
            } => write!(f, "failed to create {kind} #{index}: {source}"),
            Self::UnresolvedReference {
                kind,
                index,
                target,
                position,
            } => write!(
                f,
                "{kind} #{index} references {target} #{position}, which the dataset does not define"
            ),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) | Self::Close(err) => Some(err),
            Self::Plan(err) => Some(err),
            Self::Clear { source, .. } | Self::Step { source, .. } => Some(source),
            Self::UnresolvedReference { .. } => None,
        }
    }
}

impl From<PlanError> for SeedError {
    fn from(value: PlanError) -> Self {
        Self::Plan(value)
    }
}

/// Opens `target`, loads `dataset`, and closes the store on every path.
///
/// A load failure takes precedence over a close failure.
pub fn run(
    target: &StoreTarget,
    dataset: &Dataset,
    options: &SeedOptions,
) -> Result<SeedSummary, SeedError> {
    let store = Store::open(target).map_err(SeedError::Open)?;
    let outcome = load(&store, dataset, options);
    let closed = store.close();
    let summary = outcome?;
    closed.map_err(SeedError::Close)?;
    Ok(summary)
}

/// Loads `dataset` into an open store.
pub fn load(
    store: &Store,
    dataset: &Dataset,
    options: &SeedOptions,
) -> Result<SeedSummary, SeedError> {
    let started_at = Instant::now();
    info!(
        "event=seed_load module=seed status=start target={} clear_existing={}",
        store.target(),
        options.clear_existing
    );

    let mut loader = Loader {
        store,
        dataset,
        ids: HashMap::new(),
        summary: SeedSummary::default(),
    };
    match loader.run(options) {
        Ok(()) => {
            info!(
                "event=seed_load module=seed status=ok duration_ms={} rows={} tag_links={}",
                started_at.elapsed().as_millis(),
                loader.summary.total(),
                loader.summary.tag_links
            );
            Ok(loader.summary)
        }
        Err(err) => {
            error!(
                "event=seed_load module=seed status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

struct Loader<'a> {
    store: &'a Store,
    dataset: &'a Dataset,
    /// Created ids per kind, in dataset order.
    ids: HashMap<EntityKind, Vec<Uuid>>,
    summary: SeedSummary,
}

impl Loader<'_> {
    fn run(&mut self, options: &SeedOptions) -> Result<(), SeedError> {
        if options.clear_existing {
            for kind in clear_order()? {
                let removed = self
                    .store
                    .delete_all(kind)
                    .map_err(|source| SeedError::Clear { kind, source })?;
                self.summary.cleared += removed;
            }
        }

        for kind in load_order()? {
            let created = self.load_kind(kind)?;
            self.summary.record(kind, created);
            info!("event=seed_step module=seed status=ok kind={kind} created={created}");
        }
        Ok(())
    }

    fn load_kind(&mut self, kind: EntityKind) -> Result<usize, SeedError> {
        let ids = match kind {
            EntityKind::User => self.load_users()?,
            EntityKind::Profile => self.load_profiles()?,
            EntityKind::Funder => self.load_funders()?,
            EntityKind::Tag => self.load_tags()?,
            EntityKind::Project => self.load_projects()?,
            EntityKind::Space => self.load_spaces()?,
            EntityKind::Post => self.load_posts()?,
            EntityKind::Comment => self.load_comments()?,
            EntityKind::Annotation => self.load_annotations()?,
        };
        let created = ids.len();
        self.ids.insert(kind, ids);
        Ok(created)
    }

    /// Resolves `position` of `target` to the id created for it.
    fn resolve(
        &self,
        kind: EntityKind,
        index: usize,
        target: EntityKind,
        position: usize,
    ) -> Result<Uuid, SeedError> {
        self.ids
            .get(&target)
            .and_then(|ids| ids.get(position))
            .copied()
            .ok_or(SeedError::UnresolvedReference {
                kind,
                index,
                target,
                position,
            })
    }

    fn load_users(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.users();
        let mut ids = Vec::with_capacity(self.dataset.users.len());
        for (index, seed) in self.dataset.users.iter().enumerate() {
            let mut user = User::new(seed.name, seed.email, seed.role);
            user.affiliation = seed.affiliation.map(str::to_string);
            let id = repo
                .create_user(&user)
                .map_err(|source| step_error(EntityKind::User, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Walks users in order; only users with a profile seed produce a row.
    fn load_profiles(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.users();
        let mut ids = Vec::new();
        for (index, seed) in self.dataset.users.iter().enumerate() {
            let Some(profile_seed) = &seed.profile else {
                continue;
            };
            let user_id = self.resolve(EntityKind::Profile, index, EntityKind::User, index)?;
            let mut profile = Profile::new(user_id);
            profile.bio = profile_seed.bio.map(str::to_string);
            profile.orcid_id = profile_seed.orcid_id.map(str::to_string);
            profile.avatar_url = profile_seed.avatar_url.map(str::to_string);
            profile.set_research_areas(&profile_seed.research_areas);
            let id = repo
                .create_profile(&profile)
                .map_err(|source| step_error(EntityKind::Profile, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_funders(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.funding();
        let mut ids = Vec::with_capacity(self.dataset.funders.len());
        for (index, seed) in self.dataset.funders.iter().enumerate() {
            let mut funder = Funder::new(seed.name);
            funder.description = seed.description.map(str::to_string);
            funder.website = seed.website.map(str::to_string);
            funder.country = seed.country.map(str::to_string);
            let id = repo
                .create_funder(&funder)
                .map_err(|source| step_error(EntityKind::Funder, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_tags(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.tags();
        let mut ids = Vec::with_capacity(self.dataset.tags.len());
        for (index, seed) in self.dataset.tags.iter().enumerate() {
            let mut tag = Tag::new(seed.name);
            tag.category = seed.category.map(str::to_string);
            let id = repo
                .create_tag(&tag)
                .map_err(|source| step_error(EntityKind::Tag, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_projects(&mut self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.funding();
        let kind = EntityKind::Project;
        let mut ids = Vec::with_capacity(self.dataset.projects.len());
        for (index, seed) in self.dataset.projects.iter().enumerate() {
            let funder_id = self.resolve(kind, index, EntityKind::Funder, seed.funder)?;
            let start_date = parse_date(seed.start_date)
                .map_err(|err| step_error(kind, index, err.into()))?;
            let mut project = Project::new(seed.title, seed.summary, funder_id, start_date);
            project.description = seed.description.map(str::to_string);
            project.end_date = seed
                .end_date
                .map(parse_date)
                .transpose()
                .map_err(|err| step_error(kind, index, err.into()))?;
            project.funding_amount = seed.funding_amount;
            project.currency = seed.currency.to_string();
            project.status = seed.status;
            project.pi_user_id = seed
                .pi
                .map(|pi| self.resolve(kind, index, EntityKind::User, pi))
                .transpose()?;

            let tag_ids = seed
                .tags
                .iter()
                .map(|position| self.resolve(kind, index, EntityKind::Tag, *position))
                .collect::<Result<Vec<_>, _>>()?;

            let id = repo
                .create_project(&project, &tag_ids)
                .map_err(|source| step_error(kind, index, source))?;
            self.summary.tag_links += distinct_count(&tag_ids);
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_spaces(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.community();
        let mut ids = Vec::with_capacity(self.dataset.spaces.len());
        for (index, seed) in self.dataset.spaces.iter().enumerate() {
            let mut space = Space::new(seed.name, seed.description);
            space.visibility = seed.visibility;
            let id = repo
                .create_space(&space)
                .map_err(|source| step_error(EntityKind::Space, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_posts(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.community();
        let kind = EntityKind::Post;
        let mut ids = Vec::with_capacity(self.dataset.posts.len());
        for (index, seed) in self.dataset.posts.iter().enumerate() {
            let space_id = self.resolve(kind, index, EntityKind::Space, seed.space)?;
            let author_id = self.resolve(kind, index, EntityKind::User, seed.author)?;
            let post = Post::new(space_id, author_id, seed.title, seed.content);
            let id = repo
                .create_post(&post)
                .map_err(|source| step_error(kind, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_comments(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.community();
        let kind = EntityKind::Comment;
        let mut ids = Vec::with_capacity(self.dataset.comments.len());
        for (index, seed) in self.dataset.comments.iter().enumerate() {
            let post_id = self.resolve(kind, index, EntityKind::Post, seed.post)?;
            let author_id = self.resolve(kind, index, EntityKind::User, seed.author)?;
            let comment = Comment::new(post_id, author_id, seed.content);
            let id = repo
                .create_comment(&comment)
                .map_err(|source| step_error(kind, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_annotations(&self) -> Result<Vec<Uuid>, SeedError> {
        let repo = self.store.community();
        let kind = EntityKind::Annotation;
        let mut ids = Vec::with_capacity(self.dataset.annotations.len());
        for (index, seed) in self.dataset.annotations.iter().enumerate() {
            let project_id = self.resolve(kind, index, EntityKind::Project, seed.project)?;
            let author_id = self.resolve(kind, index, EntityKind::User, seed.author)?;
            let annotation = Annotation::new(project_id, author_id, seed.content, seed.category);
            let id = repo
                .create_annotation(&annotation)
                .map_err(|source| step_error(kind, index, source))?;
            ids.push(id);
        }
        Ok(ids)
    }
}

fn step_error(kind: EntityKind, index: usize, source: RepoError) -> SeedError {
    SeedError::Step {
        kind,
        index,
        source,
    }
}

fn distinct_count(ids: &[Uuid]) -> usize {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::{SeedError, SeedSummary};
    use crate::model::EntityKind;

    #[test]
    fn summary_lists_every_kind() {
        let mut summary = SeedSummary::default();
        summary.record(EntityKind::User, 5);
        summary.record(EntityKind::Tag, 10);
        summary.tag_links = 14;

        let rendered = summary.to_string();
        assert!(rendered.contains("- 5 users"));
        assert!(rendered.contains("- 10 tags"));
        assert!(rendered.contains("- 0 annotations"));
        assert!(rendered.ends_with("- 14 tag links"));
        assert_eq!(summary.total(), 15);
    }

    #[test]
    fn unresolved_reference_names_both_sides() {
        let err = SeedError::UnresolvedReference {
            kind: EntityKind::Post,
            index: 1,
            target: EntityKind::Space,
            position: 7,
        };
        assert_eq!(
            err.to_string(),
            "post #1 references space #7, which the dataset does not define"
        );
    }
}
