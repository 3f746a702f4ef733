//! Stories about projects and their members

use std::collections::BTreeMap;

use metakube::resources::{PlanAction, ProjectResource, Resource};
use metakube::schema::{ProjectConfig, ProjectUser};

use super::{project, setup};

/// A team creates project "p1" labelled foo=bar, later renames it to
/// "p1-changed" and drops the labels. The platform reflects both steps and
/// the refreshed state matches the configuration exactly.
#[tokio::test]
async fn story_project_rename_and_relabel() {
    let (api, ctx) = setup();
    let resource = ProjectResource::default();

    let created = project(&ctx, "p1", &[("foo", "bar")]).await;
    assert_eq!(created.config.name, "p1");
    assert_eq!(
        created.config.labels,
        BTreeMap::from([("foo".to_string(), "bar".to_string())])
    );
    assert_eq!(created.status, "Active");
    assert!(!created.creation_timestamp.is_empty());

    let changed = ProjectConfig {
        name: "p1-changed".to_string(),
        ..Default::default()
    };
    assert_eq!(
        resource.plan(&ctx, Some(&created), &changed).await.unwrap(),
        PlanAction::Update
    );
    let updated = resource.update(&ctx, &created, &changed).await.unwrap();
    assert_eq!(updated.config, changed);
    assert_eq!(updated.id, created.id);

    {
        let world = api.world();
        let stored = &world.projects[&created.id];
        assert_eq!(stored.name, "p1-changed");
        assert!(stored.labels.is_empty());
    }

    let refreshed = resource.read(&ctx, &updated).await.unwrap().unwrap();
    assert_eq!(
        resource.plan(&ctx, Some(&refreshed), &changed).await.unwrap(),
        PlanAction::NoOp
    );

    resource.delete(&ctx, &refreshed).await.unwrap();
    assert!(resource.read(&ctx, &refreshed).await.unwrap().is_none());
}

/// Members added through configuration are managed; the creator, who was
/// never configured, stays untouched when the configured members change.
#[tokio::test]
async fn story_members_are_managed_without_touching_the_creator() {
    let (api, ctx) = setup();
    let resource = ProjectResource::default();
    let user = |email: &str, role: &str| ProjectUser {
        email: email.to_string(),
        role: role.to_string(),
    };

    let with_dev = ProjectConfig {
        name: "team".to_string(),
        users: [user("dev@example.com", "editors")].into(),
        ..Default::default()
    };
    let created = resource.create(&ctx, &with_dev).await.unwrap();
    assert_eq!(created.config.users, with_dev.users);

    let promoted = ProjectConfig {
        users: [user("dev@example.com", "owners"), user("ops@example.com", "viewers")].into(),
        ..with_dev.clone()
    };
    let updated = resource.update(&ctx, &created, &promoted).await.unwrap();
    assert_eq!(updated.config.users, promoted.users);

    let emptied = ProjectConfig {
        users: Default::default(),
        ..with_dev
    };
    let updated = resource.update(&ctx, &updated, &emptied).await.unwrap();
    assert!(updated.config.users.is_empty());

    let world = api.world();
    let members: Vec<&str> = world.members[&created.id]
        .iter()
        .map(|u| u.email.as_str())
        .collect();
    assert_eq!(members, vec!["creator@example.com"]);
}

/// Importing a project reads every member, including the creator.
#[tokio::test]
async fn story_import_reads_all_members() {
    let (_api, ctx) = setup();
    let created = project(&ctx, "imported", &[]).await;

    let imported = ProjectResource::default()
        .import(&ctx, &created.id)
        .await
        .unwrap();
    let users: Vec<_> = imported.config.users.into_iter().collect();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "creator@example.com");
    assert_eq!(users[0].role, "owners");
}
