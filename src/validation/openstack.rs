//! OpenStack network checks
//!
//! Networks are matched by name and external flag: the floating IP pool must
//! be an external network, the cluster network an internal one.

use metakube_client::models::{OpenstackCredentials, OpenstackNetwork};
use metakube_client::MetakubeApi;
use tracing::debug;

use super::{Diagnostic, Diagnostics};
use crate::schema::OpenstackCloudConfig;
use crate::{Error, Result};

/// Check floating IP pool, network and subnet of an OpenStack cloud block
///
/// `path` is the path of the `openstack` block.
pub async fn network_resources(
    client: &dyn MetakubeApi,
    path: &str,
    credentials: &OpenstackCredentials,
    config: &OpenstackCloudConfig,
    diags: &mut Diagnostics,
) -> Result<()> {
    if config.floating_ip_pool.is_empty() && config.network.is_empty() {
        return Ok(());
    }

    let networks = client
        .list_openstack_networks(credentials)
        .await
        .map_err(|e| Error::api("list openstack networks", &e))?;
    debug!(count = networks.len(), "Listed OpenStack networks");

    if !config.floating_ip_pool.is_empty() {
        diags.check(find_network(
            &format!("{path}.floating_ip_pool"),
            &networks,
            &config.floating_ip_pool,
            true,
        ).map(|_| ()));
    }

    if config.network.is_empty() {
        return Ok(());
    }
    let network = match find_network(&format!("{path}.network"), &networks, &config.network, false) {
        Ok(network) => network,
        Err(d) => {
            diags.push(d);
            return Ok(());
        }
    };

    if config.subnet_id.is_empty() {
        return Ok(());
    }
    let subnets = client
        .list_openstack_subnets(credentials, &network.id)
        .await
        .map_err(|e| Error::api("list openstack subnets", &e))?;
    if !subnets.iter().any(|s| s.id == config.subnet_id) {
        diags.push(
            Diagnostic::new(
                format!("{path}.subnet_id"),
                format!(
                    "subnet {} not found in network {}",
                    config.subnet_id, config.network
                ),
            )
            .with_alternatives(subnets.iter().map(|s| format!("{} ({})", s.id, s.name))),
        );
    }
    Ok(())
}

fn find_network<'a>(
    path: &str,
    networks: &'a [OpenstackNetwork],
    name: &str,
    external: bool,
) -> Result<&'a OpenstackNetwork, Diagnostic> {
    if let Some(network) = networks
        .iter()
        .find(|n| n.name == name && n.external == external)
    {
        return Ok(network);
    }

    let kind = if external { "external" } else { "internal" };
    let mut candidates: Vec<String> = networks
        .iter()
        .filter(|n| n.external == external)
        .map(|n| n.name.clone())
        .collect();
    candidates.sort();
    Err(
        Diagnostic::new(path, format!("{kind} network {name} not found"))
            .with_alternatives(candidates),
    )
}
