//! `metakube_node_deployment`
//!
//! Node deployments belong to a cluster. Writes wait for the cluster to be
//! healthy first, then for the machine controller to observe the new
//! generation and bring all replicas up.

use async_trait::async_trait;
use metakube_client::models::{Cluster, NodeDeployment, NodeDeploymentPatch};
use metakube_client::patch;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{
    gone_as_none, ignore_gone, minutes, mutate, remaining, wait_cluster_healthy, PlanAction,
    Resource, Timeouts,
};
use crate::id::{find_cluster_project, parse_id};
use crate::poll::{deleted_or_fail, pending_or_fail, poll_until, Poll};
use crate::provider::Context;
use crate::schema::{NodeDeploymentConfig, NodeDeploymentState};
use crate::structure::{
    cloud_spec_kind, expand_node_deployment, expand_node_deployment_spec, flatten_node_deployment,
};
use crate::validation::node_deployment::{
    autoscaler, kubelet_not_newer, kubelet_offered, node_provider, operating_system,
    provider_matches,
};
use crate::validation::Diagnostics;
use crate::{Error, Result};

const SPEC_PATH: &str = "spec.0";
const CLOUD_PATH: &str = "spec.0.template.0.cloud";
const OS_PATH: &str = "spec.0.template.0.operating_system";
const KUBELET_PATH: &str = "spec.0.template.0.versions.0.kubelet";

#[derive(Clone, Debug)]
pub struct NodeDeploymentResource {
    timeouts: Timeouts,
}

impl Default for NodeDeploymentResource {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::new(minutes(20), minutes(20), minutes(10)),
        }
    }
}

impl NodeDeploymentResource {
    pub fn with_timeouts(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    /// Checks that need nothing but the configuration
    fn check_shape(config: &NodeDeploymentConfig, diags: &mut Diagnostics) {
        diags.check(autoscaler(SPEC_PATH, &config.spec));
        diags.check(operating_system(
            OS_PATH,
            config.spec.template.operating_system.as_ref(),
        ));
        diags.check(node_provider(CLOUD_PATH, &config.spec.template.cloud).map(|_| ()));
    }

    /// Project owning the cluster, looked up when not configured
    async fn project_of(ctx: &Context, config: &NodeDeploymentConfig) -> Result<String> {
        if !config.project_id.is_empty() {
            return Ok(config.project_id.clone());
        }
        find_cluster_project(ctx.api(), &config.cluster_id).await
    }

    /// The owning cluster, or `None` when it does not exist (yet)
    async fn owning_cluster(
        ctx: &Context,
        config: &NodeDeploymentConfig,
    ) -> Result<Option<Cluster>> {
        let project_id = match Self::project_of(ctx, config).await {
            Ok(id) => id,
            Err(Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        gone_as_none(
            "read cluster",
            ctx.api().get_cluster(&project_id, &config.cluster_id).await,
        )
    }

    /// Fill computed attributes the configuration leaves open from `prior`
    fn with_computed(config: &NodeDeploymentConfig, prior: &NodeDeploymentConfig) -> NodeDeploymentConfig {
        let mut desired = config.clone();
        if desired.project_id.is_empty() {
            desired.project_id = prior.project_id.clone();
        }
        let spec = &mut desired.spec;
        if spec.replicas.is_none() {
            spec.replicas = Some(spec.replicas_or_default());
        }
        if spec.dynamic_config.is_none() {
            spec.dynamic_config = prior.spec.dynamic_config;
        }
        if spec.template.versions.is_none() {
            spec.template.versions = prior.spec.template.versions.clone();
        }
        if spec.template.operating_system.is_none() {
            spec.template.operating_system = prior.spec.template.operating_system.clone();
        }
        desired
    }

    async fn wait_ready(
        ctx: &Context,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
        baseline: i64,
        deadline: Instant,
    ) -> Result<NodeDeployment> {
        poll_until(
            &format!("node deployment {node_deployment_id} to become ready"),
            remaining(deadline),
            &ctx.cancel,
            || async {
                let nd = match ctx
                    .api()
                    .get_node_deployment(project_id, cluster_id, node_deployment_id)
                    .await
                {
                    Ok(nd) => nd,
                    Err(e) => return pending_or_fail("get node deployment", e),
                };
                let Some(status) = &nd.status else {
                    return Ok(Poll::Pending("no status reported".to_string()));
                };
                if status.observed_generation <= baseline {
                    return Ok(Poll::Pending(format!(
                        "generation {} not observed yet",
                        baseline + 1
                    )));
                }
                if status.ready_replicas < nd.spec.replicas || status.unavailable_replicas != 0 {
                    return Ok(Poll::Pending(format!(
                        "{}/{} replicas ready, {} unavailable",
                        status.ready_replicas, nd.spec.replicas, status.unavailable_replicas
                    )));
                }
                Ok(Poll::Ready(nd))
            },
        )
        .await
    }

    async fn fetch(
        ctx: &Context,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
    ) -> Result<Option<NodeDeploymentState>> {
        let Some(nd) = gone_as_none(
            "read node deployment",
            ctx.api()
                .get_node_deployment(project_id, cluster_id, node_deployment_id)
                .await,
        )?
        else {
            return Ok(None);
        };
        if nd.deletion_timestamp.is_some() {
            debug!(project_id, cluster_id, node_deployment_id, "Node deployment is being deleted");
            return Ok(None);
        }
        Ok(Some(flatten_node_deployment(project_id, cluster_id, &nd)))
    }
}

#[async_trait]
impl Resource for NodeDeploymentResource {
    type Config = NodeDeploymentConfig;
    type State = NodeDeploymentState;

    const TYPE_NAME: &'static str = "metakube_node_deployment";

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn plan(
        &self,
        ctx: &Context,
        prior: Option<&NodeDeploymentState>,
        config: &NodeDeploymentConfig,
    ) -> Result<PlanAction> {
        let mut diags = Diagnostics::default();
        Self::check_shape(config, &mut diags);

        match Self::owning_cluster(ctx, config).await? {
            Some(cluster) => {
                let node_kind = node_provider(CLOUD_PATH, &config.spec.template.cloud).ok();
                if let (Some(node), Some(cluster_kind)) = (node_kind, cloud_spec_kind(&cluster.spec.cloud)) {
                    diags.check(provider_matches(CLOUD_PATH, node, cluster_kind));
                }

                if let Some(kubelet) = config.spec.template.kubelet() {
                    let unchanged = prior.and_then(|p| p.config.spec.template.kubelet())
                        == Some(kubelet);
                    match kubelet_not_newer(KUBELET_PATH, kubelet, &cluster.spec.version) {
                        Err(d) => diags.push(d),
                        Ok(()) if !unchanged => {
                            kubelet_offered(
                                ctx.api(),
                                KUBELET_PATH,
                                &cluster.spec.version,
                                kubelet,
                                &mut diags,
                            )
                            .await?
                        }
                        Ok(()) => {}
                    }
                }
            }
            None => debug!(cluster_id = %config.cluster_id, "Cluster not found, skipping cluster checks"),
        }
        diags.into_result()?;

        let Some(prior) = prior else {
            return Ok(PlanAction::Create);
        };
        let mut reasons = Vec::new();
        if prior.config.cluster_id != config.cluster_id {
            reasons.push("cluster_id".to_string());
        }
        if !config.project_id.is_empty() && prior.config.project_id != config.project_id {
            reasons.push("project_id".to_string());
        }
        if !config.name.is_empty() && prior.config.name != config.name {
            reasons.push("name".to_string());
        }
        if !reasons.is_empty() {
            return Ok(PlanAction::Replace { reasons });
        }

        let desired = Self::with_computed(config, &prior.config);
        Ok(if desired.spec == prior.config.spec {
            PlanAction::NoOp
        } else {
            PlanAction::Update
        })
    }

    async fn create(&self, ctx: &Context, config: &NodeDeploymentConfig) -> Result<NodeDeploymentState> {
        let mut diags = Diagnostics::default();
        Self::check_shape(config, &mut diags);
        diags.into_result()?;

        let deadline = Instant::now() + self.timeouts.create;
        let project_id = Self::project_of(ctx, config).await?;
        let cluster_id = config.cluster_id.as_str();

        let cluster = wait_cluster_healthy(ctx, &project_id, cluster_id, remaining(deadline)).await?;
        let body = expand_node_deployment(config, &cluster.spec.version);
        let created = mutate(ctx, "create node deployment", "createNodeDeployment", deadline, || {
            ctx.api().create_node_deployment(&project_id, cluster_id, &body)
        })
        .await?;
        info!(
            project_id = %project_id,
            cluster_id,
            node_deployment_id = %created.id,
            replicas = body.spec.replicas,
            "Created node deployment"
        );

        Self::wait_ready(ctx, &project_id, cluster_id, &created.id, 0, deadline).await?;
        Self::fetch(ctx, &project_id, cluster_id, &created.id)
            .await?
            .ok_or_else(|| Error::not_found("node deployment", &created.id))
    }

    async fn read(&self, ctx: &Context, state: &NodeDeploymentState) -> Result<Option<NodeDeploymentState>> {
        Self::fetch(ctx, &state.config.project_id, &state.config.cluster_id, &state.id).await
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: &NodeDeploymentState,
        config: &NodeDeploymentConfig,
    ) -> Result<NodeDeploymentState> {
        let mut diags = Diagnostics::default();
        Self::check_shape(config, &mut diags);
        diags.into_result()?;

        let deadline = Instant::now() + self.timeouts.update;
        let project_id = prior.config.project_id.as_str();
        let cluster_id = prior.config.cluster_id.as_str();
        let node_deployment_id = prior.id.as_str();

        let cluster = wait_cluster_healthy(ctx, project_id, cluster_id, remaining(deadline)).await?;
        let current = ctx
            .api()
            .get_node_deployment(project_id, cluster_id, node_deployment_id)
            .await
            .map_err(|e| Error::api("read node deployment", &e))?;
        let baseline = current.status.as_ref().map_or(0, |s| s.observed_generation);

        // Keep the running kubelet unless one is configured.
        let default_kubelet = if current.spec.template.versions.kubelet.is_empty() {
            cluster.spec.version.as_str()
        } else {
            current.spec.template.versions.kubelet.as_str()
        };
        let desired = Self::with_computed(config, &prior.config);
        let spec = patch::diff_bodies(
            "patchMachineDeployment",
            &expand_node_deployment_spec(&prior.config.spec, default_kubelet),
            &expand_node_deployment_spec(&desired.spec, default_kubelet),
        )
        .map_err(|e| Error::api("update node deployment", &e))?;

        if patch::is_empty(&spec) {
            debug!(project_id, cluster_id, node_deployment_id, "Node deployment spec unchanged");
        } else {
            let patch = NodeDeploymentPatch { spec };
            mutate(ctx, "update node deployment", "patchNodeDeployment", deadline, || {
                ctx.api()
                    .patch_node_deployment(project_id, cluster_id, node_deployment_id, &patch)
            })
            .await?;
            info!(project_id, cluster_id, node_deployment_id, baseline, "Patched node deployment");

            Self::wait_ready(ctx, project_id, cluster_id, node_deployment_id, baseline, deadline)
                .await?;
        }
        Self::fetch(ctx, project_id, cluster_id, node_deployment_id)
            .await?
            .ok_or_else(|| Error::not_found("node deployment", node_deployment_id))
    }

    async fn delete(&self, ctx: &Context, state: &NodeDeploymentState) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.delete;
        let project_id = state.config.project_id.as_str();
        let cluster_id = state.config.cluster_id.as_str();
        let node_deployment_id = state.id.as_str();

        let result = mutate(ctx, "delete node deployment", "deleteNodeDeployment", deadline, || {
            ctx.api()
                .delete_node_deployment(project_id, cluster_id, node_deployment_id)
        })
        .await;
        ignore_gone("delete node deployment", result)?;

        poll_until(
            &format!("node deployment {node_deployment_id} to be deleted"),
            remaining(deadline),
            &ctx.cancel,
            || async {
                match ctx
                    .api()
                    .get_node_deployment(project_id, cluster_id, node_deployment_id)
                    .await
                {
                    Ok(nd) => Ok(Poll::Pending(format!(
                        "{} replicas left",
                        nd.status.map_or(0, |s| s.replicas)
                    ))),
                    Err(e) => deleted_or_fail("get node deployment", e),
                }
            },
        )
        .await?;
        info!(project_id, cluster_id, node_deployment_id, "Deleted node deployment");
        Ok(())
    }

    /// Accepts `project_id:cluster_id:node_deployment_id` or
    /// `cluster_id:node_deployment_id`
    async fn import(&self, ctx: &Context, id: &str) -> Result<NodeDeploymentState> {
        let (project_id, cluster_id, node_deployment_id) = match parse_id::<3>(id) {
            Ok([p, c, nd]) => (p, c, nd),
            Err(_) => {
                let [c, nd] = parse_id::<2>(id)?;
                (find_cluster_project(ctx.api(), &c).await?, c, nd)
            }
        };
        Self::fetch(ctx, &project_id, &cluster_id, &node_deployment_id)
            .await?
            .ok_or_else(|| Error::not_found("node deployment", node_deployment_id))
    }
}
