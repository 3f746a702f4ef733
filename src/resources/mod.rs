//! Resource lifecycle orchestration
//!
//! Every resource kind implements [`Resource`]. An operation expands the
//! configuration, calls the API, waits for the platform to converge and
//! flattens the result into state. `plan` runs the plan-time validation and
//! decides between create, in-place update, replacement and no-op.

mod cluster;
mod node_deployment;
mod project;
mod service_account;
mod service_account_token;
mod sshkey;

pub use cluster::ClusterResource;
pub use node_deployment::NodeDeploymentResource;
pub use project::ProjectResource;
pub use service_account::ServiceAccountResource;
pub use service_account_token::ServiceAccountTokenResource;
pub use sshkey::SshKeyResource;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use metakube_client::models::{Cluster, Project, ProjectStatus};
use metakube_client::ApiResult;
use tokio::time::Instant;

use crate::error::{classify, CallKind, ErrorClass};
use crate::poll::{pending_or_fail, poll_until, Poll};
use crate::provider::Context;
use crate::retry::{retry_conflicts, RetryConfig, RetryError};
use crate::{Error, Result};

/// Per-operation deadlines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn new(create: Duration, update: Duration, delete: Duration) -> Self {
        Self {
            create,
            update,
            delete,
        }
    }

    /// The same deadline for every operation
    pub const fn uniform(timeout: Duration) -> Self {
        Self::new(timeout, timeout, timeout)
    }
}

const fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Time left until `deadline`, zero once it has passed
fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// What applying a configuration would do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    /// Destroy and recreate; `reasons` names the attributes forcing it
    Replace { reasons: Vec<String> },
    NoOp,
}

/// Lifecycle of one resource kind
#[async_trait]
pub trait Resource: Send + Sync {
    /// Configuration as written by the user
    type Config: Send + Sync;
    /// Configuration plus computed attributes, as stored in state
    type State: Send + Sync;

    /// Terraform type name, e.g. `metakube_cluster`
    const TYPE_NAME: &'static str;

    /// Deadlines used by create, update and delete
    fn timeouts(&self) -> Timeouts;

    /// Validate `config` and decide how to reach it from `prior`
    async fn plan(
        &self,
        ctx: &Context,
        prior: Option<&Self::State>,
        config: &Self::Config,
    ) -> Result<PlanAction>;

    async fn create(&self, ctx: &Context, config: &Self::Config) -> Result<Self::State>;

    /// Refresh state; `None` when the resource is gone
    async fn read(&self, ctx: &Context, state: &Self::State) -> Result<Option<Self::State>>;

    async fn update(
        &self,
        ctx: &Context,
        prior: &Self::State,
        config: &Self::Config,
    ) -> Result<Self::State>;

    /// Delete and wait until the resource is gone
    async fn delete(&self, ctx: &Context, state: &Self::State) -> Result<()>;

    /// Build state from an import ID
    async fn import(&self, ctx: &Context, id: &str) -> Result<Self::State>;
}

/// Run a write, retrying conflicts until `deadline` or cancellation
pub(crate) async fn mutate<F, Fut, T>(
    ctx: &Context,
    context: &str,
    operation: &str,
    deadline: Instant,
    call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    retry_conflicts(&RetryConfig::default(), operation, deadline, &ctx.cancel, call)
        .await
        .map_err(|e| match e {
            RetryError::Api(e) => Error::api(context, &e),
            RetryError::Cancelled => Error::Cancelled {
                description: format!("a retry of {context}"),
            },
        })
}

/// Map a read result to `None` when the resource is gone
pub(crate) fn gone_as_none<T>(context: &str, result: ApiResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if classify(&e, CallKind::Read) == ErrorClass::Gone => Ok(None),
        Err(e) => Err(Error::api(context, &e)),
    }
}

/// Ignore "already gone" on delete calls
pub(crate) fn ignore_gone(context: &str, result: Result<()>) -> Result<()> {
    match result {
        Err(Error::Api {
            status: Some(403 | 404),
            ..
        }) => {
            tracing::debug!(context, "Already deleted");
            Ok(())
        }
        other => other,
    }
}

/// Wait until a project reports `Active`
pub(crate) async fn wait_project_active(
    ctx: &Context,
    project_id: &str,
    timeout: Duration,
) -> Result<Project> {
    poll_until(
        &format!("project {project_id} to become active"),
        timeout,
        &ctx.cancel,
        || async {
            match ctx.api().get_project(project_id).await {
                Ok(project) if project.status == ProjectStatus::Active => Ok(Poll::Ready(project)),
                Ok(project) => Ok(Poll::Pending(format!("status {}", project.status))),
                Err(e) => pending_or_fail("get project", e),
            }
        },
    )
    .await
}

/// Wait until every control plane component of a cluster is up
pub(crate) async fn wait_cluster_healthy(
    ctx: &Context,
    project_id: &str,
    cluster_id: &str,
    timeout: Duration,
) -> Result<Cluster> {
    poll_until(
        &format!("cluster {cluster_id} to become healthy"),
        timeout,
        &ctx.cancel,
        || async {
            let health = match ctx.api().get_cluster_health(project_id, cluster_id).await {
                Ok(health) => health,
                Err(e) => return pending_or_fail("get cluster health", e),
            };
            if !health.all_up() {
                return Ok(Poll::Pending(format!(
                    "waiting for: {}",
                    health.pending_components().join(", ")
                )));
            }
            match ctx.api().get_cluster(project_id, cluster_id).await {
                Ok(cluster) => Ok(Poll::Ready(cluster)),
                Err(e) => pending_or_fail("get cluster", e),
            }
        },
    )
    .await
}
