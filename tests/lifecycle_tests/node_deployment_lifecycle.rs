//! Stories about node deployments and the cluster they belong to

use metakube::resources::{ClusterResource, NodeDeploymentResource, PlanAction, Resource};
use metakube::schema::{
    AwsCloudConfig, AwsNodeConfig, ClusterCloudConfig, ClusterConfig, ClusterSpecConfig,
    ClusterState, NodeCloudConfig, NodeDeploymentConfig, NodeDeploymentSpecConfig, NodeSpecConfig,
    NodeVersionsConfig, OpenstackNodeConfig, OperatingSystemConfig, UbuntuConfig,
};
use metakube::Context;

use super::{project, setup};

async fn aws_cluster(ctx: &Context) -> ClusterState {
    let project = project(ctx, "p1", &[]).await;
    let config = ClusterConfig {
        project_id: project.id,
        dc_name: "aws-eu-central-1a".to_string(),
        name: "prod".to_string(),
        spec: ClusterSpecConfig {
            version: "1.18.8".to_string(),
            cloud: ClusterCloudConfig {
                aws: Some(AwsCloudConfig::default()),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };
    ClusterResource::default().create(ctx, &config).await.unwrap()
}

fn workers(cluster_id: &str, cloud: NodeCloudConfig) -> NodeDeploymentConfig {
    NodeDeploymentConfig {
        project_id: String::new(),
        cluster_id: cluster_id.to_string(),
        name: "workers".to_string(),
        spec: NodeDeploymentSpecConfig {
            replicas: Some(2),
            template: NodeSpecConfig {
                cloud,
                operating_system: Some(OperatingSystemConfig {
                    ubuntu: Some(UbuntuConfig {
                        dist_upgrade_on_boot: false,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        },
    }
}

fn aws_nodes() -> NodeCloudConfig {
    NodeCloudConfig {
        aws: Some(AwsNodeConfig {
            instance_type: "t3.medium".to_string(),
            disk_size: 25,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// OpenStack machines cannot join an AWS cluster; the plan names both
/// providers.
#[tokio::test]
async fn story_openstack_nodes_on_aws_cluster_are_rejected() {
    let (_api, ctx) = setup();
    let cluster = aws_cluster(&ctx).await;

    let config = workers(
        &cluster.id,
        NodeCloudConfig {
            openstack: Some(OpenstackNodeConfig {
                flavor: "m1.small".to_string(),
                image: "Ubuntu Focal".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    let err = NodeDeploymentResource::default()
        .plan(&ctx, None, &config)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err
        .to_string()
        .contains("provider for node deployment must (openstack) match cluster provider (aws)"));
}

/// A kubelet newer than the control plane is refused.
#[tokio::test]
async fn story_kubelet_newer_than_cluster_is_rejected() {
    let (_api, ctx) = setup();
    let cluster = aws_cluster(&ctx).await;

    let mut config = workers(&cluster.id, aws_nodes());
    config.spec.template.versions = Some(NodeVersionsConfig {
        kubelet: "1.19.0".to_string(),
    });
    let err = NodeDeploymentResource::default()
        .plan(&ctx, None, &config)
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("kubelet version 1.19.0 cannot be greater than cluster version 1.18.8"));
}

/// Autoscaler bounds are checked before the API is asked anything about
/// the cluster.
#[tokio::test]
async fn story_autoscaler_bounds() {
    let (_api, ctx) = setup();
    let cluster = aws_cluster(&ctx).await;
    let resource = NodeDeploymentResource::default();

    let mut config = workers(&cluster.id, aws_nodes());
    config.spec.min_replicas = Some(3);
    config.spec.max_replicas = Some(5);
    let err = resource.plan(&ctx, None, &config).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("min_replicas can't be greater than replicas"));

    config.spec.max_replicas = None;
    let err = resource.plan(&ctx, None, &config).await.unwrap_err();
    assert!(err.to_string().contains("both must be set"));
}

/// Workers are created with the cluster's kubelet version, scaled in place,
/// and deleted. The project is discovered from the cluster.
#[tokio::test]
async fn story_create_scale_delete() {
    let (api, ctx) = setup();
    let cluster = aws_cluster(&ctx).await;
    let resource = NodeDeploymentResource::default();

    let config = workers(&cluster.id, aws_nodes());
    assert_eq!(
        resource.plan(&ctx, None, &config).await.unwrap(),
        PlanAction::Create
    );
    let created = resource.create(&ctx, &config).await.unwrap();
    assert_eq!(created.config.project_id, cluster.config.project_id);
    assert_eq!(created.config.spec.template.kubelet(), Some("1.18.8"));
    assert_eq!(
        resource.plan(&ctx, Some(&created), &config).await.unwrap(),
        PlanAction::NoOp
    );

    let mut scaled = config.clone();
    scaled.spec.replicas = Some(4);
    assert_eq!(
        resource.plan(&ctx, Some(&created), &scaled).await.unwrap(),
        PlanAction::Update
    );
    let updated = resource.update(&ctx, &created, &scaled).await.unwrap();
    assert_eq!(updated.config.spec.replicas, Some(4));
    {
        let world = api.world();
        let stored = world
            .node_deployments
            .get(&(cluster.id.clone(), created.id.clone()))
            .unwrap();
        assert_eq!(stored.spec.replicas, 4);
        assert_eq!(stored.status.as_ref().unwrap().observed_generation, 2);
        assert_eq!(stored.spec.template.versions.kubelet, "1.18.8");
    }

    resource.delete(&ctx, &updated).await.unwrap();
    assert!(resource.read(&ctx, &updated).await.unwrap().is_none());
}

/// Dropping the autoscaler bounds removes them from the stored deployment
/// instead of leaving the old values in place.
#[tokio::test]
async fn story_removing_autoscaler_bounds() {
    let (api, ctx) = setup();
    let cluster = aws_cluster(&ctx).await;
    let resource = NodeDeploymentResource::default();

    let mut config = workers(&cluster.id, aws_nodes());
    config.spec.min_replicas = Some(1);
    config.spec.max_replicas = Some(3);
    let created = resource.create(&ctx, &config).await.unwrap();
    assert_eq!(created.config.spec.max_replicas, Some(3));

    let mut fixed = config.clone();
    fixed.spec.min_replicas = None;
    fixed.spec.max_replicas = None;
    assert_eq!(
        resource.plan(&ctx, Some(&created), &fixed).await.unwrap(),
        PlanAction::Update
    );
    let updated = resource.update(&ctx, &created, &fixed).await.unwrap();
    assert_eq!(updated.config.spec.min_replicas, None);
    assert_eq!(updated.config.spec.max_replicas, None);
    {
        let world = api.world();
        let stored = &world.node_deployments[&(cluster.id.clone(), created.id.clone())];
        assert_eq!(stored.spec.min_replicas, None);
        assert_eq!(stored.spec.max_replicas, None);
        assert_eq!(stored.spec.replicas, 2);
    }
    assert_eq!(
        resource.plan(&ctx, Some(&updated), &fixed).await.unwrap(),
        PlanAction::NoOp
    );
}

/// `cluster_id:node_deployment_id` imports find the project on their own.
#[tokio::test]
async fn story_import_without_project() {
    let (_api, ctx) = setup();
    let cluster = aws_cluster(&ctx).await;
    let resource = NodeDeploymentResource::default();
    let created = resource
        .create(&ctx, &workers(&cluster.id, aws_nodes()))
        .await
        .unwrap();

    let imported = resource
        .import(&ctx, &format!("{}:{}", cluster.id, created.id))
        .await
        .unwrap();
    assert_eq!(imported, created);
}
