//! Read-only data sources

mod k8s_version;

pub use k8s_version::{K8sVersionConfig, K8sVersionDataSource, K8sVersionState};

use async_trait::async_trait;

use crate::provider::Context;
use crate::Result;

/// A lookup evaluated at plan time
#[async_trait]
pub trait DataSource: Send + Sync {
    type Config: Send + Sync;
    type State: Send + Sync;

    /// Terraform type name, e.g. `metakube_k8s_version`
    const TYPE_NAME: &'static str;

    async fn read(&self, ctx: &Context, config: &Self::Config) -> Result<Self::State>;
}
