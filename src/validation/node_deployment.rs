//! Node deployment checks: autoscaler bounds, template shape, and agreement
//! with the owning cluster

use metakube_client::MetakubeApi;

use super::{parse_version, require_version, Diagnostic, Diagnostics};
use crate::schema::{NodeCloudConfig, NodeDeploymentSpecConfig, OperatingSystemConfig, ProviderKind};
use crate::{Error, Result};

/// Check the autoscaler bounds
///
/// `min_replicas` and `max_replicas` come together, and `replicas` (default 1)
/// must lie within them.
pub fn autoscaler(path: &str, spec: &NodeDeploymentSpecConfig) -> Result<(), Diagnostic> {
    let (min, max) = match (spec.min_replicas, spec.max_replicas) {
        (None, None) => return Ok(()),
        (Some(min), Some(max)) => (min, max),
        _ => {
            return Err(Diagnostic::new(
                path,
                "min_replicas and max_replicas: both must be set",
            ))
        }
    };

    if min > max {
        return Err(Diagnostic::new(
            path,
            "min_replicas must be smaller than max_replicas",
        ));
    }

    let replicas = spec.replicas_or_default();
    if replicas > max {
        return Err(Diagnostic::new(
            path,
            "max_replicas can't be smaller than replicas",
        ));
    }
    if replicas < min {
        return Err(Diagnostic::new(
            path,
            "min_replicas can't be greater than replicas",
        ));
    }
    Ok(())
}

/// The node template's provider, which must be exactly one
pub fn node_provider(path: &str, cloud: &NodeCloudConfig) -> Result<ProviderKind, Diagnostic> {
    match cloud.populated().as_slice() {
        [kind] => Ok(*kind),
        [] => Err(Diagnostic::new(
            path,
            "one of aws, openstack, azure must be specified",
        )),
        many => {
            let names: Vec<&str> = many.iter().map(ProviderKind::as_str).collect();
            Err(Diagnostic::new(
                path,
                format!(
                    "only one cloud provider may be configured, found: {}",
                    names.join(", ")
                ),
            ))
        }
    }
}

/// At most one operating system may be chosen
pub fn operating_system(path: &str, os: Option<&OperatingSystemConfig>) -> Result<(), Diagnostic> {
    let populated = os.map(OperatingSystemConfig::populated).unwrap_or_default();
    if populated.len() > 1 {
        return Err(Diagnostic::new(
            path,
            format!(
                "only one operating system may be configured, found: {}",
                populated.join(", ")
            ),
        ));
    }
    Ok(())
}

/// The node provider must be the cluster's provider
pub fn provider_matches(
    path: &str,
    node: ProviderKind,
    cluster: ProviderKind,
) -> Result<(), Diagnostic> {
    if node != cluster {
        return Err(Diagnostic::new(
            path,
            format!(
                "provider for node deployment must ({node}) match cluster provider ({cluster})"
            ),
        ));
    }
    Ok(())
}

/// The kubelet may not be newer than the control plane
pub fn kubelet_not_newer(path: &str, kubelet: &str, cluster_version: &str) -> Result<(), Diagnostic> {
    let kubelet_v = require_version(path, kubelet)?;
    let Some(cluster_v) = parse_version(cluster_version) else {
        // Nothing to compare against while the cluster reports no version.
        return Ok(());
    };
    if kubelet_v > cluster_v {
        return Err(Diagnostic::new(
            path,
            format!("kubelet version {kubelet} cannot be greater than cluster version {cluster_version}"),
        ));
    }
    Ok(())
}

/// Check that `kubelet` is offered for the cluster's control plane version
pub async fn kubelet_offered(
    client: &dyn MetakubeApi,
    path: &str,
    cluster_version: &str,
    kubelet: &str,
    diags: &mut Diagnostics,
) -> Result<()> {
    let offered = client
        .list_node_upgrades(cluster_version)
        .await
        .map_err(|e| Error::api("list node versions", &e))?;

    let wanted = parse_version(kubelet);
    let matching = offered
        .iter()
        .find(|v| wanted.is_some() && parse_version(&v.version) == wanted);

    match matching {
        Some(v) if v.restricted_by_kubelet_version => diags.push(Diagnostic::new(
            path,
            format!("kubelet version {kubelet} is restricted for cluster version {cluster_version}"),
        )),
        Some(_) => {}
        None => {
            let mut allowed: Vec<_> = offered
                .iter()
                .filter(|v| !v.restricted_by_kubelet_version)
                .filter_map(|v| parse_version(&v.version).map(|p| (p, v.version.clone())))
                .collect();
            allowed.sort();
            diags.push(
                Diagnostic::new(
                    path,
                    format!("kubelet version {kubelet} is not offered for cluster version {cluster_version}"),
                )
                .with_alternatives(allowed.into_iter().map(|(_, v)| v)),
            );
        }
    }
    Ok(())
}
