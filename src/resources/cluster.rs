//! `metakube_cluster`
//!
//! A cluster is created once its project is active and is usable once all
//! control plane components report healthy. Credentials in the cloud block
//! are write-only on the API side; reads keep the configured values.

use std::collections::BTreeSet;

use async_trait::async_trait;
use metakube_client::models::{ClusterPatch, CreateClusterRequest};
use metakube_client::patch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    gone_as_none, ignore_gone, minutes, mutate, remaining, wait_cluster_healthy,
    wait_project_active, PlanAction, Resource, Timeouts,
};
use crate::id::{find_cluster_project, parse_id, SEPARATOR};
use crate::poll::{deleted_or_fail, poll_until, Poll};
use crate::provider::Context;
use crate::schema::{CloudProvider, ClusterConfig, ClusterState};
use crate::structure::{
    expand_cluster, expand_cluster_spec, flatten_cluster_spec, format_timestamp, label_patch,
    openstack_credentials, own_labels,
};
use crate::validation::cluster::{cloud_provider, datacenter_matches, is_downgrade, version_available};
use crate::validation::openstack::network_resources;
use crate::validation::{require_version, Diagnostics};
use crate::{Error, Result};

const CLOUD_PATH: &str = "spec.0.cloud";
const VERSION_PATH: &str = "spec.0.version";

#[derive(Clone, Debug)]
pub struct ClusterResource {
    timeouts: Timeouts,
}

impl Default for ClusterResource {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::uniform(minutes(20)),
        }
    }
}

impl ClusterResource {
    pub fn with_timeouts(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    /// Fill attributes the server defaults from `prior` where `config` leaves
    /// them open
    fn with_computed(config: &ClusterConfig, prior: &ClusterConfig) -> ClusterConfig {
        let mut desired = config.clone();
        let (spec, known) = (&mut desired.spec, &prior.spec);
        for (value, prior_value) in [
            (&mut spec.pods_cidr, &known.pods_cidr),
            (&mut spec.services_cidr, &known.services_cidr),
            (&mut spec.domain_name, &known.domain_name),
        ] {
            if value.is_empty() {
                value.clone_from(prior_value);
            }
        }
        if spec.enable_ssh_agent.is_none() {
            spec.enable_ssh_agent = known.enable_ssh_agent;
        }
        if spec.cni_plugin.is_none() {
            spec.cni_plugin.clone_from(&known.cni_plugin);
        }
        desired
    }

    /// Merge patch of the cluster `spec`, `None` when nothing changes
    fn spec_patch(
        prior: &ClusterConfig,
        desired: &ClusterConfig,
        provider: &CloudProvider,
    ) -> Result<Option<serde_json::Value>> {
        if prior.spec == desired.spec {
            return Ok(None);
        }
        let prior_provider =
            cloud_provider(CLOUD_PATH, &prior.spec.cloud).unwrap_or_else(|_| provider.clone());
        let from = expand_cluster_spec(&prior.spec, &prior.dc_name, &prior_provider);
        let to = expand_cluster_spec(&desired.spec, &desired.dc_name, provider);
        let diff = patch::diff_bodies("patchClusterV2", &from, &to)
            .map_err(|e| Error::api("update cluster", &e))?;
        Ok((!patch::is_empty(&diff)).then_some(diff))
    }

    /// Plan-time checks; returns the validated cloud provider
    async fn validate(
        ctx: &Context,
        prior: Option<&ClusterConfig>,
        config: &ClusterConfig,
    ) -> Result<CloudProvider> {
        let provider = cloud_provider(CLOUD_PATH, &config.spec.cloud)?;
        let mut diags = Diagnostics::default();

        if let Err(d) = require_version(VERSION_PATH, &config.spec.version) {
            diags.push(d);
        } else if prior.map_or(true, |p| p.spec.version != config.spec.version) {
            version_available(ctx.api(), VERSION_PATH, &config.spec.version, &mut diags).await?;
        }

        let placement_changed = prior.map_or(true, |p| {
            p.dc_name != config.dc_name || p.spec.cloud.populated() != config.spec.cloud.populated()
        });
        if placement_changed {
            datacenter_matches(ctx.api(), "dc_name", &config.dc_name, provider.kind(), &mut diags)
                .await?;
        }

        if let CloudProvider::Openstack(os) = &provider {
            let changed = prior.map_or(true, |p| p.spec.cloud.openstack.as_ref() != Some(os));
            if changed {
                let credentials = openstack_credentials(&config.dc_name, os);
                network_resources(
                    ctx.api(),
                    &format!("{CLOUD_PATH}.0.openstack.0"),
                    &credentials,
                    os,
                    &mut diags,
                )
                .await?;
            }
        }

        diags.into_result()?;
        Ok(provider)
    }

    async fn fetch(
        ctx: &Context,
        project_id: &str,
        cluster_id: &str,
        prior: Option<&ClusterConfig>,
        prior_kube_config: &str,
    ) -> Result<Option<ClusterState>> {
        let api = ctx.api();
        let Some(cluster) =
            gone_as_none("read cluster", api.get_cluster(project_id, cluster_id).await)?
        else {
            return Ok(None);
        };
        if cluster.deletion_timestamp.is_some() {
            debug!(project_id, cluster_id, "Cluster is being deleted");
            return Ok(None);
        }

        let project = api
            .get_project(project_id)
            .await
            .map_err(|e| Error::api("read project", &e))?;
        let sshkeys: BTreeSet<String> = api
            .list_cluster_ssh_keys(project_id, cluster_id)
            .await
            .map_err(|e| Error::api("list cluster ssh keys", &e))?
            .into_iter()
            .map(|k| k.id)
            .collect();
        let kube_config = match api.get_cluster_kubeconfig(project_id, cluster_id).await {
            Ok(kc) => kc,
            Err(e) => {
                warn!(project_id, cluster_id, error = %e, "Could not read kubeconfig, keeping previous value");
                prior_kube_config.to_string()
            }
        };

        Ok(Some(ClusterState {
            id: cluster.id.clone(),
            config: ClusterConfig {
                project_id: project_id.to_string(),
                dc_name: cluster.spec.cloud.datacenter.clone(),
                name: cluster.name.clone(),
                labels: own_labels(&cluster.labels, &project.labels, prior.map(|p| &p.labels)),
                sshkeys,
                spec: flatten_cluster_spec(prior.map(|p| &p.spec), &cluster.spec),
            },
            kube_config,
            creation_timestamp: format_timestamp(cluster.creation_timestamp),
            deletion_timestamp: format_timestamp(cluster.deletion_timestamp),
        }))
    }

    async fn sync_ssh_keys(
        ctx: &Context,
        project_id: &str,
        cluster_id: &str,
        previous: &BTreeSet<String>,
        desired: &BTreeSet<String>,
        deadline: Instant,
    ) -> Result<()> {
        for key_id in desired.difference(previous) {
            debug!(project_id, cluster_id, key_id = %key_id, "Assigning SSH key");
            mutate(ctx, "assign ssh key", "assignSSHKeyToCluster", deadline, || {
                ctx.api().assign_ssh_key_to_cluster(project_id, cluster_id, key_id)
            })
            .await?;
        }
        for key_id in previous.difference(desired) {
            debug!(project_id, cluster_id, key_id = %key_id, "Detaching SSH key");
            let result = mutate(ctx, "detach ssh key", "detachSSHKeyFromCluster", deadline, || {
                ctx.api().detach_ssh_key_from_cluster(project_id, cluster_id, key_id)
            })
            .await;
            ignore_gone("detach ssh key", result)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for ClusterResource {
    type Config = ClusterConfig;
    type State = ClusterState;

    const TYPE_NAME: &'static str = "metakube_cluster";

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn plan(
        &self,
        ctx: &Context,
        prior: Option<&ClusterState>,
        config: &ClusterConfig,
    ) -> Result<PlanAction> {
        let provider = Self::validate(ctx, prior.map(|p| &p.config), config).await?;
        let Some(prior) = prior else {
            return Ok(PlanAction::Create);
        };

        let mut reasons = Vec::new();
        if prior.config.project_id != config.project_id {
            reasons.push("project_id".to_string());
        }
        if prior.config.dc_name != config.dc_name {
            reasons.push("dc_name".to_string());
        }
        if prior.config.spec.cloud.populated() != vec![provider.kind()] {
            reasons.push(format!("{CLOUD_PATH}.0.{}", provider.kind()));
        }
        if is_downgrade(&prior.config.spec.version, &config.spec.version) {
            reasons.push(VERSION_PATH.to_string());
        }

        Ok(if !reasons.is_empty() {
            PlanAction::Replace { reasons }
        } else if prior.config == Self::with_computed(config, &prior.config) {
            PlanAction::NoOp
        } else {
            PlanAction::Update
        })
    }

    async fn create(&self, ctx: &Context, config: &ClusterConfig) -> Result<ClusterState> {
        let provider = cloud_provider(CLOUD_PATH, &config.spec.cloud)?;
        let deadline = Instant::now() + self.timeouts.create;
        let project_id = config.project_id.as_str();

        wait_project_active(ctx, project_id, remaining(deadline)).await?;

        let request = CreateClusterRequest {
            cluster: expand_cluster(config, &provider),
        };
        let created = mutate(ctx, "create cluster", "createCluster", deadline, || {
            ctx.api().create_cluster(project_id, &request)
        })
        .await?;
        let cluster_id = created.id.as_str();
        info!(project_id, cluster_id, version = %config.spec.version, "Created cluster");

        wait_cluster_healthy(ctx, project_id, cluster_id, remaining(deadline)).await?;
        Self::sync_ssh_keys(ctx, project_id, cluster_id, &BTreeSet::new(), &config.sshkeys, deadline)
            .await?;

        Self::fetch(ctx, project_id, cluster_id, Some(config), "")
            .await?
            .ok_or_else(|| Error::not_found("cluster", cluster_id))
    }

    async fn read(&self, ctx: &Context, state: &ClusterState) -> Result<Option<ClusterState>> {
        Self::fetch(
            ctx,
            &state.config.project_id,
            &state.id,
            Some(&state.config),
            &state.kube_config,
        )
        .await
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: &ClusterState,
        config: &ClusterConfig,
    ) -> Result<ClusterState> {
        let provider = cloud_provider(CLOUD_PATH, &config.spec.cloud)?;
        let deadline = Instant::now() + self.timeouts.update;
        let project_id = prior.config.project_id.as_str();
        let cluster_id = prior.id.as_str();

        wait_cluster_healthy(ctx, project_id, cluster_id, remaining(deadline)).await?;

        let desired = Self::with_computed(config, &prior.config);
        let patch = ClusterPatch {
            name: (prior.config.name != desired.name).then(|| desired.name.clone()),
            labels: label_patch(&prior.config.labels, &desired.labels),
            spec: Self::spec_patch(&prior.config, &desired, &provider)?,
        };
        if patch != ClusterPatch::default() {
            mutate(ctx, "update cluster", "patchCluster", deadline, || {
                ctx.api().patch_cluster(project_id, cluster_id, &patch)
            })
            .await?;
            info!(project_id, cluster_id, "Patched cluster");
            wait_cluster_healthy(ctx, project_id, cluster_id, remaining(deadline)).await?;
        }

        Self::sync_ssh_keys(
            ctx,
            project_id,
            cluster_id,
            &prior.config.sshkeys,
            &config.sshkeys,
            deadline,
        )
        .await?;

        Self::fetch(ctx, project_id, cluster_id, Some(&desired), &prior.kube_config)
            .await?
            .ok_or_else(|| Error::not_found("cluster", cluster_id))
    }

    async fn delete(&self, ctx: &Context, state: &ClusterState) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.delete;
        let project_id = state.config.project_id.as_str();
        let cluster_id = state.id.as_str();

        let result = mutate(ctx, "delete cluster", "deleteCluster", deadline, || {
            ctx.api().delete_cluster(project_id, cluster_id)
        })
        .await;
        ignore_gone("delete cluster", result)?;

        poll_until(
            &format!("cluster {cluster_id} to be deleted"),
            remaining(deadline),
            &ctx.cancel,
            || async {
                match ctx.api().get_cluster(project_id, cluster_id).await {
                    Ok(c) if c.deletion_timestamp.is_some() => {
                        Ok(Poll::Pending("deletion in progress".to_string()))
                    }
                    Ok(_) => Ok(Poll::Pending("deletion not started".to_string())),
                    Err(e) => deleted_or_fail("get cluster", e),
                }
            },
        )
        .await?;
        info!(project_id, cluster_id, "Deleted cluster");
        Ok(())
    }

    /// Accepts `project_id:cluster_id` or a bare cluster ID
    async fn import(&self, ctx: &Context, id: &str) -> Result<ClusterState> {
        let (project_id, cluster_id) = if id.contains(SEPARATOR) {
            let [project_id, cluster_id] = parse_id::<2>(id)?;
            (project_id, cluster_id)
        } else {
            (find_cluster_project(ctx.api(), id).await?, id.to_string())
        };
        Self::fetch(ctx, &project_id, &cluster_id, None, "")
            .await?
            .ok_or_else(|| Error::not_found("cluster", cluster_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        AwsCloudConfig, ClusterCloudConfig, ClusterSpecConfig, CniPluginConfig, OpenstackCloudConfig,
        UpdateWindowConfig,
    };
    use crate::structure::expand_cloud_spec;
    use metakube_client::models::{
        AwsCloudSpec, CloudSpec, Cluster, ClusterSpec, MasterVersion, Project, SshKey,
    };
    use metakube_client::{ApiError, MockMetakubeApi};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn aws_config(version: &str) -> ClusterConfig {
        ClusterConfig {
            project_id: "p1".to_string(),
            dc_name: "aws-eu-central-1a".to_string(),
            name: "c1".to_string(),
            spec: ClusterSpecConfig {
                version: version.to_string(),
                cloud: ClusterCloudConfig {
                    aws: Some(AwsCloudConfig {
                        access_key_id: "AKIA".to_string(),
                        secret_access_key: "secret".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn versions(api: &mut MockMetakubeApi) {
        api.expect_list_master_versions().returning(|| {
            Ok(["1.17.0", "1.18.8"]
                .into_iter()
                .map(|v| MasterVersion {
                    version: v.to_string(),
                    ..Default::default()
                })
                .collect())
        });
    }

    #[tokio::test]
    async fn version_downgrade_forces_replacement() {
        let mut api = MockMetakubeApi::new();
        versions(&mut api);
        let ctx = Context::new(Arc::new(api));

        let prior = ClusterState {
            id: "c1".to_string(),
            config: aws_config("1.18.8"),
            ..Default::default()
        };
        let action = ClusterResource::default()
            .plan(&ctx, Some(&prior), &aws_config("1.17.0"))
            .await
            .unwrap();
        assert_eq!(
            action,
            PlanAction::Replace {
                reasons: vec!["spec.0.version".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn upgrade_is_an_update() {
        let mut api = MockMetakubeApi::new();
        versions(&mut api);
        let ctx = Context::new(Arc::new(api));

        let prior = ClusterState {
            id: "c1".to_string(),
            config: aws_config("1.17.0"),
            ..Default::default()
        };
        let action = ClusterResource::default()
            .plan(&ctx, Some(&prior), &aws_config("1.18.8"))
            .await
            .unwrap();
        assert_eq!(action, PlanAction::Update);
    }

    #[tokio::test]
    async fn server_defaults_in_state_do_not_drift() {
        let mut api = MockMetakubeApi::new();
        versions(&mut api);
        let ctx = Context::new(Arc::new(api));

        let mut known = aws_config("1.18.8");
        known.spec.pods_cidr = "172.25.0.0/16".to_string();
        known.spec.services_cidr = "10.240.16.0/20".to_string();
        known.spec.domain_name = "cluster.local".to_string();
        known.spec.enable_ssh_agent = Some(true);
        known.spec.cni_plugin = Some(CniPluginConfig {
            plugin_type: "canal".to_string(),
        });
        let prior = ClusterState {
            id: "c1".to_string(),
            config: known,
            ..Default::default()
        };

        let action = ClusterResource::default()
            .plan(&ctx, Some(&prior), &aws_config("1.18.8"))
            .await
            .unwrap();
        assert_eq!(action, PlanAction::NoOp);
    }

    #[test]
    fn removed_settings_are_patched_to_null() {
        let mut prior = aws_config("1.18.8");
        prior.spec.pods_cidr = "172.25.0.0/16".to_string();
        prior.spec.admission_plugins = BTreeSet::from(["PodNodeSelector".to_string()]);
        prior.spec.update_window = Some(UpdateWindowConfig {
            start: "Tue 02:00".to_string(),
            length: "2h".to_string(),
        });
        let desired = ClusterResource::with_computed(&aws_config("1.18.8"), &prior);
        let provider = cloud_provider(CLOUD_PATH, &desired.spec.cloud).unwrap();

        let spec = ClusterResource::spec_patch(&prior, &desired, &provider)
            .unwrap()
            .unwrap();
        assert_eq!(
            spec,
            serde_json::json!({"admissionPlugins": null, "updateWindow": null})
        );
    }

    #[test]
    fn unchanged_spec_needs_no_patch() {
        let config = aws_config("1.18.8");
        let provider = cloud_provider(CLOUD_PATH, &config.spec.cloud).unwrap();
        assert!(ClusterResource::spec_patch(&config, &config, &provider)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn two_cloud_blocks_fail_before_any_call() {
        let mut config = aws_config("1.18.8");
        config.spec.cloud.openstack = Some(OpenstackCloudConfig::default());
        let ctx = Context::new(Arc::new(MockMetakubeApi::new()));

        let err = ClusterResource::default()
            .plan(&ctx, None, &config)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("found: aws, openstack"));
    }

    #[tokio::test]
    async fn read_drops_project_labels_and_keeps_credentials() {
        let config = aws_config("1.18.8");
        let mut api = MockMetakubeApi::new();
        api.expect_get_cluster().returning(|_, id| {
            Ok(Cluster {
                id: id.to_string(),
                name: "c1".to_string(),
                labels: BTreeMap::from([
                    ("team".to_string(), "infra".to_string()),
                    ("env".to_string(), "prod".to_string()),
                ]),
                spec: ClusterSpec {
                    version: "1.18.8".to_string(),
                    cloud: CloudSpec {
                        datacenter: "aws-eu-central-1a".to_string(),
                        aws: Some(AwsCloudSpec::default()),
                        ..Default::default()
                    },
                    ..Default::default()
                },
                ..Default::default()
            })
        });
        api.expect_get_project().returning(|id| {
            Ok(Project {
                id: id.to_string(),
                labels: BTreeMap::from([("team".to_string(), "infra".to_string())]),
                ..Default::default()
            })
        });
        api.expect_list_cluster_ssh_keys().returning(|_, _| {
            Ok(vec![SshKey {
                id: "key-1".to_string(),
                ..Default::default()
            }])
        });
        api.expect_get_cluster_kubeconfig()
            .returning(|_, _| Err(ApiError::status("getClusterKubeconfig", 500, "")));
        let ctx = Context::new(Arc::new(api));

        let prior = ClusterState {
            id: "c1".to_string(),
            config,
            kube_config: "apiVersion: v1".to_string(),
            ..Default::default()
        };
        let state = ClusterResource::default()
            .read(&ctx, &prior)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            state.config.labels,
            BTreeMap::from([("env".to_string(), "prod".to_string())])
        );
        assert_eq!(state.config.sshkeys, BTreeSet::from(["key-1".to_string()]));
        assert_eq!(state.kube_config, "apiVersion: v1");
        let aws = state.config.spec.cloud.aws.unwrap();
        assert_eq!(aws.secret_access_key, "secret");
    }

    #[tokio::test]
    async fn missing_cluster_reads_as_gone() {
        let mut api = MockMetakubeApi::new();
        api.expect_get_cluster()
            .returning(|_, _| Err(ApiError::status("getCluster", 404, "")));
        let ctx = Context::new(Arc::new(api));
        let state = ClusterState {
            id: "c1".to_string(),
            config: aws_config("1.18.8"),
            ..Default::default()
        };
        assert!(ClusterResource::default().read(&ctx, &state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_import_id_is_rejected() {
        let ctx = Context::new(Arc::new(MockMetakubeApi::new()));
        let err = ClusterResource::default()
            .import(&ctx, "p1:")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
    }

    #[test]
    fn expanded_cloud_names_the_datacenter() {
        let config = aws_config("1.18.8");
        let provider = cloud_provider(CLOUD_PATH, &config.spec.cloud).unwrap();
        let spec = expand_cloud_spec(&config.dc_name, &provider);
        assert_eq!(spec.datacenter, "aws-eu-central-1a");
        assert!(spec.aws.is_some());
    }
}
