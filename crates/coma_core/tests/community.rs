use coma_core::model::community::{Annotation, Comment, Post, Space, Visibility};
use coma_core::model::funding::{Funder, Project};
use coma_core::model::user::{User, UserRole};
use coma_core::model::{parse_date, EntityKind};
use coma_core::{
    CommunityRepository, ConflictError, ErrorKind, FundingRepository, RepoError, Store,
    UserRepository,
};
use uuid::Uuid;

fn store_with_author() -> (Store, Uuid) {
    let store = Store::open_in_memory().unwrap();
    let author = store
        .users()
        .create_user(&User::new("Anna", "anna@example.com", UserRole::Researcher))
        .unwrap();
    (store, author)
}

#[test]
fn post_to_missing_space_is_not_found_and_writes_nothing() {
    let (store, author) = store_with_author();
    let missing_space = Uuid::new_v4();

    let err = store
        .community()
        .create_post(&Post::new(missing_space, author, "Hello", "Body"))
        .unwrap_err();

    match err {
        RepoError::NotFound { entity, id } => {
            assert_eq!(entity, EntityKind::Space);
            assert_eq!(id, missing_space);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count(EntityKind::Post).unwrap(), 0);
}

#[test]
fn post_by_missing_author_is_not_found() {
    let (store, _) = store_with_author();
    let community = store.community();
    let space_id = community
        .create_space(&Space::new("Climate", "Climate research"))
        .unwrap();

    let err = community
        .create_post(&Post::new(space_id, Uuid::new_v4(), "Hello", "Body"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::User,
            ..
        }
    ));
}

#[test]
fn comments_and_annotations_require_their_parents() {
    let (store, author) = store_with_author();
    let community = store.community();

    let err = community
        .create_comment(&Comment::new(Uuid::new_v4(), author, "Nice"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(store.count(EntityKind::Comment).unwrap(), 0);

    let err = community
        .create_annotation(&Annotation::new(Uuid::new_v4(), author, "Note", "Review"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Project,
            ..
        }
    ));
    assert_eq!(store.count(EntityKind::Annotation).unwrap(), 0);
}

#[test]
fn deleting_post_cascades_comments_and_space_delete_is_blocked() {
    let (store, author) = store_with_author();
    let community = store.community();
    let space_id = community
        .create_space(&Space::new("AI Research", "Discussions"))
        .unwrap();
    let post_id = community
        .create_post(&Post::new(space_id, author, "Ethics", "Thoughts on AI ethics"))
        .unwrap();
    let comment_id = community
        .create_comment(&Comment::new(post_id, author, "Agreed"))
        .unwrap();

    let err = community.delete_space(space_id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(ConflictError::StillReferenced {
            entity: EntityKind::Space,
            referenced_by: EntityKind::Post,
            ..
        })
    ));

    community.delete_post(post_id).unwrap();
    assert!(community.get_comment(comment_id).unwrap().is_none());
    community.delete_space(space_id).unwrap();
    assert!(community.get_space(space_id).unwrap().is_none());
}

#[test]
fn children_are_listed_in_creation_order() {
    let (store, author) = store_with_author();
    let community = store.community();
    let space_id = community
        .create_space(&Space::new("Healthcare", "Clinical topics"))
        .unwrap();
    let post_id = community
        .create_post(&Post::new(space_id, author, "Trials", "Recruiting"))
        .unwrap();

    let first = Comment::new(post_id, author, "First");
    let mut second = Comment::new(post_id, author, "Second");
    second.created_at = first.created_at + 1;
    community.create_comment(&second).unwrap();
    community.create_comment(&first).unwrap();

    let contents: Vec<String> = community
        .list_comments_on_post(post_id)
        .unwrap()
        .into_iter()
        .map(|comment| comment.content)
        .collect();
    assert_eq!(contents, vec!["First", "Second"]);

    let posts = community.list_posts_in_space(space_id).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, post_id);
}

#[test]
fn spaces_filter_by_visibility_and_update_in_place() {
    let (store, _) = store_with_author();
    let community = store.community();
    let mut private = Space::new("Board", "Funder board");
    private.visibility = Visibility::Private;
    community.create_space(&private).unwrap();
    community
        .create_space(&Space::new("Open Science", "Everyone welcome"))
        .unwrap();

    let public = community.list_spaces(Some(Visibility::Public)).unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].name, "Open Science");
    assert_eq!(community.list_spaces(None).unwrap().len(), 2);

    private.description = "Funder board, invite only".to_string();
    community.update_space(&private).unwrap();
    let loaded = community.get_space(private.id).unwrap().unwrap();
    assert_eq!(loaded.description, "Funder board, invite only");

    private.name = " ".to_string();
    assert_eq!(
        community.update_space(&private).unwrap_err().kind(),
        ErrorKind::Validation
    );
}

#[test]
fn annotations_update_and_list_per_project() {
    let (store, author) = store_with_author();
    let funder_id = store
        .funding()
        .create_funder(&Funder::new("European Commission"))
        .unwrap();
    let project_id = store
        .funding()
        .create_project(
            &Project::new(
                "Early Detection",
                "Cancer screening",
                funder_id,
                parse_date("2023-09-01").unwrap(),
            ),
            &[],
        )
        .unwrap();

    let community = store.community();
    let mut annotation = Annotation::new(project_id, author, "Promising", "Progress Review");
    community.create_annotation(&annotation).unwrap();

    annotation.content = "Very promising".to_string();
    annotation.category = "Impact".to_string();
    community.update_annotation(&annotation).unwrap();

    let listed = community.list_annotations_for_project(project_id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content, "Very promising");
    assert_eq!(listed[0].category, "Impact");

    community.delete_annotation(annotation.id).unwrap();
    assert!(community
        .list_annotations_for_project(project_id)
        .unwrap()
        .is_empty());
}
