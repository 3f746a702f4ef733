//! Cluster checks: cloud exclusivity, versions, and datacenters

use metakube_client::MetakubeApi;
use semver::Version;

use super::{parse_version, Diagnostic, Diagnostics};
use crate::schema::{CloudProvider, ClusterCloudConfig, ProviderKind};
use crate::{Error, Result};

/// Turn the cloud block into a single provider
///
/// Fails when no block or more than one block is present; the failure names
/// every populated provider.
pub fn cloud_provider(path: &str, cloud: &ClusterCloudConfig) -> Result<CloudProvider, Diagnostic> {
    let populated = cloud.populated();
    if populated.len() > 1 {
        let names: Vec<&str> = populated.iter().map(ProviderKind::as_str).collect();
        return Err(Diagnostic::new(
            path,
            format!(
                "only one cloud provider may be configured, found: {}",
                names.join(", ")
            ),
        ));
    }

    let provider = match (&cloud.aws, &cloud.openstack, &cloud.azure, &cloud.bringyourown) {
        (Some(aws), _, _, _) => CloudProvider::Aws(aws.clone()),
        (_, Some(openstack), _, _) => CloudProvider::Openstack(openstack.clone()),
        (_, _, Some(azure), _) => CloudProvider::Azure(azure.clone()),
        (_, _, _, Some(_)) => CloudProvider::BringYourOwn,
        (None, None, None, None) => {
            let names: Vec<&str> = ProviderKind::ALL.iter().map(ProviderKind::as_str).collect();
            return Err(Diagnostic::new(
                path,
                format!("one of {} must be specified", names.join(", ")),
            ));
        }
    };
    Ok(provider)
}

/// True when moving from `prior` to `desired` lowers the version
///
/// Unparsable versions never count as a downgrade.
pub fn is_downgrade(prior: &str, desired: &str) -> bool {
    match (parse_version(prior), parse_version(desired)) {
        (Some(prior), Some(desired)) => desired < prior,
        _ => false,
    }
}

/// Check that `version` is one of the offered control plane versions
pub async fn version_available(
    client: &dyn MetakubeApi,
    path: &str,
    version: &str,
    diags: &mut Diagnostics,
) -> Result<()> {
    let offered = client
        .list_master_versions()
        .await
        .map_err(|e| Error::api("list cluster versions", &e))?;

    let wanted = parse_version(version);
    let found = offered.iter().any(|v| match (&wanted, parse_version(&v.version)) {
        (Some(wanted), Some(candidate)) => *wanted == candidate,
        _ => v.version == version,
    });

    if !found {
        let mut versions: Vec<(Option<Version>, String)> = offered
            .iter()
            .map(|v| (parse_version(&v.version), v.version.clone()))
            .collect();
        versions.sort();
        diags.push(
            Diagnostic::new(path, format!("unknown version {version}"))
                .with_alternatives(versions.into_iter().map(|(_, v)| v)),
        );
    }
    Ok(())
}

/// Check that the datacenter exists and serves the configured provider
///
/// Bring-your-own clusters may use any datacenter.
pub async fn datacenter_matches(
    client: &dyn MetakubeApi,
    path: &str,
    dc_name: &str,
    kind: ProviderKind,
    diags: &mut Diagnostics,
) -> Result<()> {
    let datacenters = client
        .list_datacenters()
        .await
        .map_err(|e| Error::api("list datacenters", &e))?;

    let Some(dc) = datacenters.iter().find(|dc| dc.metadata.name == dc_name) else {
        let mut names: Vec<String> = datacenters
            .iter()
            .filter(|dc| !dc.spec.provider.is_empty())
            .map(|dc| dc.metadata.name.clone())
            .collect();
        names.sort();
        diags.push(
            Diagnostic::new(path, format!("unknown datacenter {dc_name}")).with_alternatives(names),
        );
        return Ok(());
    };

    if kind == ProviderKind::BringYourOwn {
        return Ok(());
    }
    match ProviderKind::parse(&dc.spec.provider) {
        Some(dc_kind) if dc_kind != kind => diags.push(Diagnostic::new(
            path,
            format!("datacenter {dc_name} provides {dc_kind} clusters, not {kind}"),
        )),
        _ => {}
    }
    Ok(())
}
