//! Stories about clusters inside a project

use std::collections::{BTreeMap, BTreeSet};

use metakube::resources::{ClusterResource, PlanAction, Resource, SshKeyResource};
use metakube::schema::{
    AwsCloudConfig, BringYourOwnCloudConfig, ClusterCloudConfig, ClusterConfig, ClusterSpecConfig,
    OpenstackCloudConfig, SshKeyConfig, UpdateWindowConfig,
};
use metakube::Error;

use super::{project, setup};

fn aws_cluster(project_id: &str, version: &str) -> ClusterConfig {
    ClusterConfig {
        project_id: project_id.to_string(),
        dc_name: "aws-eu-central-1a".to_string(),
        name: "prod".to_string(),
        labels: BTreeMap::from([("tier".to_string(), "backend".to_string())]),
        spec: ClusterSpecConfig {
            version: version.to_string(),
            audit_logging: true,
            pods_cidr: "172.25.0.0/16".to_string(),
            services_cidr: "10.240.16.0/20".to_string(),
            domain_name: "cluster.local".to_string(),
            cloud: ClusterCloudConfig {
                aws: Some(AwsCloudConfig {
                    access_key_id: "AKIAEXAMPLE".to_string(),
                    secret_access_key: "s3cr3t".to_string(),
                    vpc_id: "vpc-1".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A cluster created at 1.18.8 refreshes without drift even though the API
/// never returns the AWS credentials and adds the project's labels. Asking
/// for 1.17.0 afterwards is a downgrade and plans a replacement.
#[tokio::test]
async fn story_downgrade_forces_replacement() {
    let (_api, ctx) = setup();
    let resource = ClusterResource::default();
    let project = project(&ctx, "p1", &[("team", "infra")]).await;

    let config = aws_cluster(&project.id, "1.18.8");
    assert_eq!(
        resource.plan(&ctx, None, &config).await.unwrap(),
        PlanAction::Create
    );
    let created = resource.create(&ctx, &config).await.unwrap();
    assert_eq!(created.config, config);
    assert!(created.kube_config.starts_with("apiVersion: v1"));

    let refreshed = resource.read(&ctx, &created).await.unwrap().unwrap();
    assert_eq!(refreshed.config, config);
    assert_eq!(
        resource.plan(&ctx, Some(&refreshed), &config).await.unwrap(),
        PlanAction::NoOp
    );

    let downgrade = aws_cluster(&project.id, "1.17.0");
    assert_eq!(
        resource.plan(&ctx, Some(&refreshed), &downgrade).await.unwrap(),
        PlanAction::Replace {
            reasons: vec!["spec.0.version".to_string()]
        }
    );
}

/// Label and SSH key changes are applied in place.
#[tokio::test]
async fn story_labels_and_ssh_keys_update_in_place() {
    let (api, ctx) = setup();
    let resource = ClusterResource::default();
    let project = project(&ctx, "p1", &[]).await;

    let key = SshKeyResource::default()
        .create(
            &ctx,
            &SshKeyConfig {
                project_id: project.id.clone(),
                name: "admin".to_string(),
                public_key: "ssh-ed25519 AAAA admin@example.com".to_string(),
            },
        )
        .await
        .unwrap();

    let config = aws_cluster(&project.id, "1.18.8");
    let created = resource.create(&ctx, &config).await.unwrap();

    let changed = ClusterConfig {
        labels: BTreeMap::from([("tier".to_string(), "frontend".to_string())]),
        sshkeys: BTreeSet::from([key.id.clone()]),
        ..config
    };
    assert_eq!(
        resource.plan(&ctx, Some(&created), &changed).await.unwrap(),
        PlanAction::Update
    );
    let updated = resource.update(&ctx, &created, &changed).await.unwrap();
    assert_eq!(updated.config, changed);

    let world = api.world();
    assert_eq!(world.cluster_keys[&created.id], BTreeSet::from([key.id.clone()]));
}

/// Networking left to the service is defaulted on creation and does not show
/// up as drift. Dropping admission plugins and the update window clears them
/// on the server.
#[tokio::test]
async fn story_defaults_stay_and_removed_settings_are_cleared() {
    let (api, ctx) = setup();
    let resource = ClusterResource::default();
    let project = project(&ctx, "p1", &[]).await;

    let mut config = aws_cluster(&project.id, "1.18.8");
    config.spec.pods_cidr.clear();
    config.spec.services_cidr.clear();
    config.spec.domain_name.clear();
    config.spec.admission_plugins = BTreeSet::from(["PodNodeSelector".to_string()]);
    config.spec.update_window = Some(UpdateWindowConfig {
        start: "Tue 02:00".to_string(),
        length: "2h".to_string(),
    });

    let created = resource.create(&ctx, &config).await.unwrap();
    assert_eq!(created.config.spec.pods_cidr, "172.25.0.0/16");
    assert_eq!(created.config.spec.services_cidr, "10.240.16.0/20");
    assert_eq!(created.config.spec.domain_name, "cluster.local");
    let refreshed = resource.read(&ctx, &created).await.unwrap().unwrap();
    assert_eq!(
        resource.plan(&ctx, Some(&refreshed), &config).await.unwrap(),
        PlanAction::NoOp
    );

    let mut trimmed = config.clone();
    trimmed.spec.admission_plugins.clear();
    trimmed.spec.update_window = None;
    assert_eq!(
        resource.plan(&ctx, Some(&refreshed), &trimmed).await.unwrap(),
        PlanAction::Update
    );
    let updated = resource.update(&ctx, &refreshed, &trimmed).await.unwrap();
    assert!(updated.config.spec.admission_plugins.is_empty());
    assert_eq!(updated.config.spec.update_window, None);
    assert_eq!(updated.config.spec.pods_cidr, "172.25.0.0/16");
    {
        let world = api.world();
        let (_, stored) = &world.clusters[&created.id];
        assert!(stored.spec.admission_plugins.is_empty());
        assert_eq!(stored.spec.update_window, None);
    }
    assert_eq!(
        resource.plan(&ctx, Some(&updated), &trimmed).await.unwrap(),
        PlanAction::NoOp
    );
}

/// Naming two providers fails at plan time and the message lists both.
#[tokio::test]
async fn story_conflicting_cloud_blocks_are_rejected() {
    let (_api, ctx) = setup();
    let mut config = aws_cluster("p1", "1.18.8");
    config.spec.cloud.openstack = Some(OpenstackCloudConfig::default());
    config.spec.cloud.bringyourown = Some(BringYourOwnCloudConfig {});

    let err = ClusterResource::default()
        .plan(&ctx, None, &config)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err
        .to_string()
        .contains("only one cloud provider may be configured, found: aws, openstack, bringyourown"));
}

/// A datacenter serving another provider and an unknown version are both
/// reported, each with what would have been accepted.
#[tokio::test]
async fn story_placement_errors_list_alternatives() {
    let (_api, ctx) = setup();
    let mut config = aws_cluster("p1", "1.99.0");
    config.dc_name = "dbl1".to_string();

    let err = ClusterResource::default()
        .plan(&ctx, None, &config)
        .await
        .unwrap_err();
    let diags = match err {
        Error::Validation(diags) => diags,
        other => panic!("expected validation error, got {other}"),
    };
    let messages: Vec<String> = diags.iter().map(ToString::to_string).collect();
    assert!(messages
        .iter()
        .any(|m| m.contains("unknown version 1.99.0") && m.contains("1.17.0, 1.18.8")));
    assert!(messages
        .iter()
        .any(|m| m.contains("datacenter dbl1 provides openstack clusters, not aws")));
}

/// Clusters can be imported by bare ID; the owning project is discovered.
#[tokio::test]
async fn story_import_by_bare_cluster_id() {
    let (_api, ctx) = setup();
    let resource = ClusterResource::default();
    let project = project(&ctx, "p1", &[]).await;
    let created = resource
        .create(&ctx, &aws_cluster(&project.id, "1.18.8"))
        .await
        .unwrap();

    let imported = resource.import(&ctx, &created.id).await.unwrap();
    assert_eq!(imported.config.project_id, project.id);
    assert_eq!(imported.config.name, "prod");

    resource.delete(&ctx, &imported).await.unwrap();
    assert!(resource.read(&ctx, &created).await.unwrap().is_none());
}
