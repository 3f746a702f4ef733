use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DataSource;
use crate::provider::Context;
use crate::validation::parse_version;
use crate::{Error, Result};

/// Filter for `metakube_k8s_version`; unset parts match anything
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct K8sVersionConfig {
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub minor: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct K8sVersionState {
    /// Same as `version`
    pub id: String,
    #[serde(flatten)]
    pub config: K8sVersionConfig,
    pub version: String,
}

/// Highest offered control plane version matching the filter
#[derive(Clone, Debug, Default)]
pub struct K8sVersionDataSource;

fn matches(filter: Option<&str>, part: u64) -> bool {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => f.parse::<u64>().is_ok_and(|want| want == part),
        None => true,
    }
}

#[async_trait]
impl DataSource for K8sVersionDataSource {
    type Config = K8sVersionConfig;
    type State = K8sVersionState;

    const TYPE_NAME: &'static str = "metakube_k8s_version";

    async fn read(&self, ctx: &Context, config: &K8sVersionConfig) -> Result<K8sVersionState> {
        let offered = ctx
            .api()
            .list_master_versions()
            .await
            .map_err(|e| Error::api("list cluster versions", &e))?;

        let best: Option<(Version, &str)> = offered
            .iter()
            .filter_map(|v| parse_version(&v.version).map(|p| (p, v.version.as_str())))
            .filter(|(p, _)| {
                matches(config.major.as_deref(), p.major) && matches(config.minor.as_deref(), p.minor)
            })
            .max_by(|a, b| a.0.cmp(&b.0));

        let Some((_, version)) = best else {
            let filter = [config.major.as_deref(), config.minor.as_deref()]
                .into_iter()
                .map(|p| p.unwrap_or("*"))
                .collect::<Vec<_>>()
                .join(".");
            return Err(Error::not_found("kubernetes version", filter));
        };
        debug!(version, "Selected Kubernetes version");

        Ok(K8sVersionState {
            id: version.to_string(),
            config: config.clone(),
            version: version.to_string(),
        })
    }
}
