use coma_core::model::community::Annotation;
use coma_core::model::funding::{Funder, Project, ProjectStatus};
use coma_core::model::tag::Tag;
use coma_core::model::user::{User, UserRole};
use coma_core::model::{parse_date, EntityKind, ValidationError};
use coma_core::{
    CommunityRepository, ConflictError, ErrorKind, FundingRepository, ProjectListQuery,
    RepoError, Store, TagRepository, UserRepository,
};
use uuid::Uuid;

struct Fixture {
    store: Store,
    funder_id: Uuid,
    pi_id: Uuid,
}

fn fixture() -> Fixture {
    let store = Store::open_in_memory().unwrap();
    let funder_id = store
        .funding()
        .create_funder(&Funder::new("Horizon Europe"))
        .unwrap();
    let pi_id = store
        .users()
        .create_user(&User::new("Anna", "anna@example.com", UserRole::Researcher))
        .unwrap();
    Fixture {
        store,
        funder_id,
        pi_id,
    }
}

fn project(fx: &Fixture, title: &str, start: &str) -> Project {
    let mut project = Project::new(title, "Summary", fx.funder_id, parse_date(start).unwrap());
    project.pi_user_id = Some(fx.pi_id);
    project.funding_amount = 250_000.0;
    project
}

fn tag(fx: &Fixture, name: &str) -> Uuid {
    fx.store.tags().create_tag(&Tag::new(name)).unwrap()
}

#[test]
fn create_project_with_tags_links_both_directions() {
    let fx = fixture();
    let ai = tag(&fx, "Artificial Intelligence");
    let health = tag(&fx, "Healthcare");

    let project_id = fx
        .store
        .funding()
        .create_project(&project(&fx, "AI Diagnostics", "2024-01-01"), &[health, ai])
        .unwrap();

    let tags = fx.store.tags();
    let names: Vec<String> = tags
        .tags_of_project(project_id)
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(names, vec!["Artificial Intelligence", "Healthcare"]);
    assert_eq!(tags.projects_with_tag(ai).unwrap(), vec![project_id]);
    assert_eq!(tags.projects_with_tag(health).unwrap(), vec![project_id]);
    assert_eq!(tags.count_links().unwrap(), 2);

    let stored = fx.store.funding().get_project(project_id).unwrap().unwrap();
    assert_eq!(stored.funding_amount, 250_000.0);
    assert_eq!(stored.start_date, parse_date("2024-01-01").unwrap());
}

#[test]
fn end_before_start_is_rejected_without_writing() {
    let fx = fixture();
    let mut bad = project(&fx, "Backwards", "2024-06-01");
    bad.end_date = Some(parse_date("2024-01-01").unwrap());

    let err = fx.store.funding().create_project(&bad, &[]).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EndBeforeStart { .. })
    ));
    assert_eq!(fx.store.count(EntityKind::Project).unwrap(), 0);
}

#[test]
fn negative_funding_is_rejected_without_writing() {
    let fx = fixture();
    let mut bad = project(&fx, "Debt", "2024-01-01");
    bad.funding_amount = -1.0;

    let err = fx.store.funding().create_project(&bad, &[]).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidFundingAmount(_))
    ));
    assert_eq!(fx.store.count(EntityKind::Project).unwrap(), 0);
}

#[test]
fn missing_references_are_not_found_and_roll_back() {
    let fx = fixture();
    let funding = fx.store.funding();

    let mut orphan = project(&fx, "Orphan", "2024-01-01");
    orphan.funder_id = Uuid::new_v4();
    let err = funding.create_project(&orphan, &[]).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Funder,
            ..
        }
    ));

    let mut no_pi = project(&fx, "No PI", "2024-01-01");
    no_pi.pi_user_id = Some(Uuid::new_v4());
    let err = funding.create_project(&no_pi, &[]).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::User,
            ..
        }
    ));

    let real_tag = tag(&fx, "Climate");
    let missing_tag = Uuid::new_v4();
    let err = funding
        .create_project(&project(&fx, "Half tagged", "2024-01-01"), &[real_tag, missing_tag])
        .unwrap_err();
    match err {
        RepoError::NotFound { entity, id } => {
            assert_eq!(entity, EntityKind::Tag);
            assert_eq!(id, missing_tag);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(fx.store.count(EntityKind::Project).unwrap(), 0);
    assert_eq!(fx.store.tags().count_links().unwrap(), 0);
}

#[test]
fn attach_is_idempotent_and_detach_keeps_tags() {
    let fx = fixture();
    let tags = fx.store.tags();
    let ai = tag(&fx, "AI");
    let water = tag(&fx, "Water");
    let project_id = fx
        .store
        .funding()
        .create_project(&project(&fx, "Clean Water AI", "2023-03-01"), &[ai])
        .unwrap();

    assert_eq!(tags.attach_tags(project_id, &[ai, water]).unwrap(), 1);
    assert_eq!(tags.attach_tags(project_id, &[ai, water]).unwrap(), 0);
    assert_eq!(tags.count_links().unwrap(), 2);

    assert_eq!(tags.detach_tags(project_id, &[water]).unwrap(), 1);
    assert_eq!(tags.detach_tags(project_id, &[water]).unwrap(), 0);
    assert!(tags.get_tag(water).unwrap().is_some());
    assert!(tags.projects_with_tag(water).unwrap().is_empty());
    assert_eq!(tags.count_links().unwrap(), 1);
}

#[test]
fn attach_to_missing_project_or_tag_is_not_found() {
    let fx = fixture();
    let tags = fx.store.tags();
    let ai = tag(&fx, "AI");

    let err = tags.attach_tags(Uuid::new_v4(), &[ai]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let project_id = fx
        .store
        .funding()
        .create_project(&project(&fx, "Tagged", "2024-01-01"), &[])
        .unwrap();
    let err = tags
        .attach_tags(project_id, &[ai, Uuid::new_v4()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(tags.count_links().unwrap(), 0);
}

#[test]
fn tag_names_are_unique_case_insensitively() {
    let fx = fixture();
    let tags = fx.store.tags();
    tags.create_tag(&Tag::new("Climate Change")).unwrap();

    let err = tags.create_tag(&Tag::new("climate change")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(ConflictError::TagNameInUse(_))
    ));
    assert!(tags.find_tag_by_name("CLIMATE CHANGE").unwrap().is_some());
}

#[test]
fn list_projects_filters_by_status_and_tag() {
    let fx = fixture();
    let funding = fx.store.funding();
    let ai = tag(&fx, "AI");

    let mut active = project(&fx, "Active AI", "2024-01-01");
    active.status = ProjectStatus::Active;
    let active_id = funding.create_project(&active, &[ai]).unwrap();
    let planned_id = funding
        .create_project(&project(&fx, "Planned", "2025-01-01"), &[])
        .unwrap();

    let all: Vec<Uuid> = funding
        .list_projects(&ProjectListQuery::default())
        .unwrap()
        .into_iter()
        .map(|project| project.id)
        .collect();
    assert_eq!(all, vec![planned_id, active_id]);

    let by_status = funding
        .list_projects(&ProjectListQuery {
            status: Some(ProjectStatus::Active),
            ..ProjectListQuery::default()
        })
        .unwrap();
    assert_eq!(by_status.len(), 1);
    assert_eq!(by_status[0].id, active_id);

    let by_tag = funding
        .list_projects(&ProjectListQuery {
            tag_id: Some(ai),
            funder_id: Some(fx.funder_id),
            ..ProjectListQuery::default()
        })
        .unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, active_id);
}

#[test]
fn update_project_revalidates_and_checks_references() {
    let fx = fixture();
    let funding = fx.store.funding();
    let mut stored = project(&fx, "Evolving", "2024-01-01");
    funding.create_project(&stored, &[]).unwrap();

    stored.status = ProjectStatus::Completed;
    stored.end_date = Some(parse_date("2024-12-31").unwrap());
    funding.update_project(&stored).unwrap();
    let loaded = funding.get_project(stored.id).unwrap().unwrap();
    assert_eq!(loaded.status, ProjectStatus::Completed);
    assert_eq!(loaded.end_date, stored.end_date);

    let mut negative = stored.clone();
    negative.funding_amount = -5.0;
    assert_eq!(
        funding.update_project(&negative).unwrap_err().kind(),
        ErrorKind::Validation
    );

    let mut moved = stored.clone();
    moved.funder_id = Uuid::new_v4();
    assert_eq!(
        funding.update_project(&moved).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn deletion_policy_for_funders_tags_and_projects() {
    let fx = fixture();
    let funding = fx.store.funding();
    let tags = fx.store.tags();
    let ai = tag(&fx, "AI");
    let project_id = funding
        .create_project(&project(&fx, "Doomed", "2024-01-01"), &[ai])
        .unwrap();
    fx.store
        .community()
        .create_annotation(&Annotation::new(project_id, fx.pi_id, "Looks good", "Review"))
        .unwrap();

    let err = funding.delete_funder(fx.funder_id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(ConflictError::StillReferenced {
            entity: EntityKind::Funder,
            referenced_by: EntityKind::Project,
            ..
        })
    ));

    tags.delete_tag(ai).unwrap();
    assert!(funding.get_project(project_id).unwrap().is_some());
    assert_eq!(tags.count_links().unwrap(), 0);

    funding.delete_project(project_id).unwrap();
    assert_eq!(fx.store.count(EntityKind::Annotation).unwrap(), 0);
    funding.delete_funder(fx.funder_id).unwrap();
    assert_eq!(
        funding.delete_project(project_id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn padded_tag_names_are_stored_trimmed_and_stay_unique() {
    let fx = fixture();
    let tags = fx.store.tags();
    let mut renamed = Tag::new("Robotics");
    tags.create_tag(&renamed).unwrap();

    renamed.name = "  AI  ".to_string();
    tags.update_tag(&renamed).unwrap();
    assert_eq!(tags.get_tag(renamed.id).unwrap().unwrap().name, "AI");

    let err = tags.create_tag(&Tag::new("ai")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(ConflictError::TagNameInUse(_))
    ));

    let mut padded = Tag::new("Energy");
    padded.name = " Energy ".to_string();
    tags.create_tag(&padded).unwrap();
    assert!(tags.find_tag_by_name("energy").unwrap().is_some());
    assert_eq!(tags.list_tags(None).unwrap().len(), 2);
}
