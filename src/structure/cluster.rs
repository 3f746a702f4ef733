use std::collections::BTreeMap;

use metakube_client::models::{
    AuditLoggingSettings, AwsCloudSpec, AzureCloudSpec, BringYourOwnCloudSpec, CloudSpec, Cluster,
    ClusterNetworkingConfig, ClusterSpec, CniPluginSettings, MachineNetwork, NetworkRanges,
    OpenstackCloudSpec, OpenstackCredentials, UpdateWindow,
};

use super::preserve;
use crate::schema::{
    AwsCloudConfig, AzureCloudConfig, BringYourOwnCloudConfig, CloudProvider, ClusterCloudConfig,
    ClusterConfig, ClusterSpecConfig, CniPluginConfig, MachineNetworkConfig, OpenstackCloudConfig,
    ProviderKind, UpdateWindowConfig,
};

const CLUSTER_TYPE: &str = "kubernetes";

/// Creation body for a cluster whose cloud block passed validation
pub fn expand_cluster(config: &ClusterConfig, cloud: &CloudProvider) -> Cluster {
    Cluster {
        name: config.name.clone(),
        labels: config.labels.clone(),
        cluster_type: CLUSTER_TYPE.to_string(),
        spec: expand_cluster_spec(&config.spec, &config.dc_name, cloud),
        ..Default::default()
    }
}

pub fn expand_cluster_spec(
    spec: &ClusterSpecConfig,
    dc_name: &str,
    cloud: &CloudProvider,
) -> ClusterSpec {
    ClusterSpec {
        cloud: expand_cloud_spec(dc_name, cloud),
        version: spec.version.clone(),
        update_window: spec.update_window.as_ref().map(|w| UpdateWindow {
            start: w.start.clone(),
            length: w.length.clone(),
        }),
        machine_networks: spec
            .machine_networks
            .iter()
            .map(|n| MachineNetwork {
                cidr: n.cidr.clone(),
                gateway: n.gateway.clone(),
                dns_servers: n.dns_servers.clone(),
            })
            .collect(),
        audit_logging: Some(AuditLoggingSettings {
            enabled: spec.audit_logging,
        }),
        use_pod_security_policy_admission_plugin: Some(spec.pod_security_policy),
        use_pod_node_selector_admission_plugin: Some(spec.pod_node_selector),
        admission_plugins: spec.admission_plugins.iter().cloned().collect(),
        enable_user_ssh_key_agent: spec.enable_ssh_agent,
        cluster_network: expand_cluster_network(spec),
        cni_plugin: spec
            .cni_plugin
            .as_ref()
            .filter(|c| !c.plugin_type.is_empty())
            .map(|c| CniPluginSettings {
                plugin_type: c.plugin_type.clone(),
                ..Default::default()
            }),
    }
}

fn expand_cluster_network(spec: &ClusterSpecConfig) -> Option<ClusterNetworkingConfig> {
    let ranges = |cidr: &str| {
        (!cidr.is_empty()).then(|| NetworkRanges {
            cidr_blocks: vec![cidr.to_string()],
        })
    };
    let network = ClusterNetworkingConfig {
        pods: ranges(&spec.pods_cidr),
        services: ranges(&spec.services_cidr),
        dns_domain: spec.domain_name.clone(),
    };
    if network == ClusterNetworkingConfig::default() {
        None
    } else {
        Some(network)
    }
}

pub fn expand_cloud_spec(dc_name: &str, cloud: &CloudProvider) -> CloudSpec {
    let mut spec = CloudSpec {
        datacenter: dc_name.to_string(),
        ..Default::default()
    };
    match cloud {
        CloudProvider::Aws(aws) => {
            spec.aws = Some(AwsCloudSpec {
                access_key_id: aws.access_key_id.clone(),
                secret_access_key: aws.secret_access_key.clone(),
                vpc_id: aws.vpc_id.clone(),
                security_group_id: aws.security_group_id.clone(),
                route_table_id: aws.route_table_id.clone(),
                instance_profile_name: aws.instance_profile_name.clone(),
                role_arn: aws.role_arn.clone(),
                openstack_billing_tenant: aws.openstack_billing_tenant.clone(),
            })
        }
        CloudProvider::Openstack(os) => {
            spec.openstack = Some(OpenstackCloudSpec {
                username: os.username.clone(),
                password: os.password.clone(),
                tenant: os.tenant.clone(),
                tenant_id: os.tenant_id.clone(),
                domain: os.domain.clone(),
                application_credential_id: os.application_credential_id.clone(),
                application_credential_secret: os.application_credential_secret.clone(),
                floating_ip_pool: os.floating_ip_pool.clone(),
                security_groups: os.security_group.clone(),
                network: os.network.clone(),
                subnet_id: os.subnet_id.clone(),
                subnet_cidr: os.subnet_cidr.clone(),
                server_group_id: os.server_group_id.clone(),
            })
        }
        CloudProvider::Azure(azure) => {
            spec.azure = Some(AzureCloudSpec {
                client_id: azure.client_id.clone(),
                client_secret: azure.client_secret.clone(),
                subscription_id: azure.subscription_id.clone(),
                tenant_id: azure.tenant_id.clone(),
                resource_group: azure.resource_group.clone(),
                route_table: azure.route_table.clone(),
                security_group: azure.security_group.clone(),
                subnet: azure.subnet.clone(),
                vnet: azure.vnet.clone(),
                availability_set: azure.availability_set.clone(),
                openstack_billing_tenant: azure.openstack_billing_tenant.clone(),
            })
        }
        CloudProvider::BringYourOwn => spec.bringyourown = Some(BringYourOwnCloudSpec {}),
    }
    spec
}

/// Credentials used to list OpenStack networks for a planned cluster
pub fn openstack_credentials(dc_name: &str, os: &OpenstackCloudConfig) -> OpenstackCredentials {
    OpenstackCredentials {
        datacenter: dc_name.to_string(),
        domain: os.domain.clone(),
        tenant: os.tenant.clone(),
        tenant_id: os.tenant_id.clone(),
        username: os.username.clone(),
        password: os.password.clone(),
        application_credential_id: os.application_credential_id.clone(),
        application_credential_secret: os.application_credential_secret.clone(),
    }
}

/// Provider of a cluster as reported by the API
pub fn cloud_spec_kind(cloud: &CloudSpec) -> Option<ProviderKind> {
    if cloud.aws.is_some() {
        Some(ProviderKind::Aws)
    } else if cloud.openstack.is_some() {
        Some(ProviderKind::Openstack)
    } else if cloud.azure.is_some() {
        Some(ProviderKind::Azure)
    } else if cloud.bringyourown.is_some() {
        Some(ProviderKind::BringYourOwn)
    } else {
        None
    }
}

/// Flatten a cluster spec, keeping credentials from `prior`
pub fn flatten_cluster_spec(
    prior: Option<&ClusterSpecConfig>,
    spec: &ClusterSpec,
) -> ClusterSpecConfig {
    let network = spec.cluster_network.clone().unwrap_or_default();
    let first_block = |ranges: Option<NetworkRanges>| {
        ranges
            .and_then(|r| r.cidr_blocks.into_iter().next())
            .unwrap_or_default()
    };

    ClusterSpecConfig {
        version: spec.version.clone(),
        enable_ssh_agent: spec.enable_user_ssh_key_agent,
        update_window: spec.update_window.as_ref().map(|w| UpdateWindowConfig {
            start: w.start.clone(),
            length: w.length.clone(),
        }),
        cloud: flatten_cloud_spec(prior.map(|p| &p.cloud), &spec.cloud),
        machine_networks: spec
            .machine_networks
            .iter()
            .map(|n| MachineNetworkConfig {
                cidr: n.cidr.clone(),
                gateway: n.gateway.clone(),
                dns_servers: n.dns_servers.clone(),
            })
            .collect(),
        audit_logging: spec.audit_logging.as_ref().is_some_and(|a| a.enabled),
        pod_security_policy: spec
            .use_pod_security_policy_admission_plugin
            .unwrap_or(false),
        pod_node_selector: spec.use_pod_node_selector_admission_plugin.unwrap_or(false),
        admission_plugins: spec.admission_plugins.iter().cloned().collect(),
        services_cidr: first_block(network.services),
        pods_cidr: first_block(network.pods),
        domain_name: network.dns_domain,
        cni_plugin: spec
            .cni_plugin
            .as_ref()
            .filter(|c| !c.plugin_type.is_empty())
            .map(|c| CniPluginConfig {
                plugin_type: c.plugin_type.clone(),
            }),
    }
}

/// Flatten the populated provider of a cloud spec
///
/// Credentials the API did not return are taken from `prior`.
pub fn flatten_cloud_spec(prior: Option<&ClusterCloudConfig>, cloud: &CloudSpec) -> ClusterCloudConfig {
    let mut out = ClusterCloudConfig::default();

    if let Some(aws) = &cloud.aws {
        let prior = prior.and_then(|p| p.aws.as_ref());
        out.aws = Some(AwsCloudConfig {
            access_key_id: preserve(&aws.access_key_id, prior.map(|p| p.access_key_id.as_str())),
            secret_access_key: preserve(
                &aws.secret_access_key,
                prior.map(|p| p.secret_access_key.as_str()),
            ),
            vpc_id: aws.vpc_id.clone(),
            security_group_id: aws.security_group_id.clone(),
            route_table_id: aws.route_table_id.clone(),
            instance_profile_name: aws.instance_profile_name.clone(),
            role_arn: aws.role_arn.clone(),
            openstack_billing_tenant: aws.openstack_billing_tenant.clone(),
        });
    } else if let Some(os) = &cloud.openstack {
        let prior = prior.and_then(|p| p.openstack.as_ref());
        let keep = |api: &str, pick: fn(&OpenstackCloudConfig) -> &str| {
            preserve(api, prior.map(pick))
        };
        out.openstack = Some(OpenstackCloudConfig {
            username: keep(&os.username, |p| &p.username),
            password: keep(&os.password, |p| &p.password),
            tenant: keep(&os.tenant, |p| &p.tenant),
            tenant_id: keep(&os.tenant_id, |p| &p.tenant_id),
            domain: keep(&os.domain, |p| &p.domain),
            application_credential_id: keep(&os.application_credential_id, |p| {
                &p.application_credential_id
            }),
            application_credential_secret: keep(&os.application_credential_secret, |p| {
                &p.application_credential_secret
            }),
            floating_ip_pool: os.floating_ip_pool.clone(),
            security_group: os.security_groups.clone(),
            network: os.network.clone(),
            subnet_id: os.subnet_id.clone(),
            subnet_cidr: os.subnet_cidr.clone(),
            server_group_id: os.server_group_id.clone(),
        });
    } else if let Some(azure) = &cloud.azure {
        let prior = prior.and_then(|p| p.azure.as_ref());
        let keep = |api: &str, pick: fn(&AzureCloudConfig) -> &str| {
            preserve(api, prior.map(pick))
        };
        out.azure = Some(AzureCloudConfig {
            client_id: keep(&azure.client_id, |p| &p.client_id),
            client_secret: keep(&azure.client_secret, |p| &p.client_secret),
            subscription_id: keep(&azure.subscription_id, |p| &p.subscription_id),
            tenant_id: keep(&azure.tenant_id, |p| &p.tenant_id),
            resource_group: azure.resource_group.clone(),
            route_table: azure.route_table.clone(),
            security_group: azure.security_group.clone(),
            subnet: azure.subnet.clone(),
            vnet: azure.vnet.clone(),
            availability_set: azure.availability_set.clone(),
            openstack_billing_tenant: azure.openstack_billing_tenant.clone(),
        });
    } else if cloud.bringyourown.is_some() {
        out.bringyourown = Some(BringYourOwnCloudConfig {});
    }

    out
}

/// Cluster labels without the ones inherited from the project
///
/// A label equal to a project label is inherited unless `configured` sets it
/// to the same value.
pub fn own_labels(
    cluster: &BTreeMap<String, String>,
    project: &BTreeMap<String, String>,
    configured: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    cluster
        .iter()
        .filter(|(k, v)| {
            project.get(*k) != Some(*v) || configured.and_then(|c| c.get(*k)) == Some(*v)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Merge-patch label map: changed keys with their value, removed keys as null
pub fn label_patch(
    prior: &BTreeMap<String, String>,
    desired: &BTreeMap<String, String>,
) -> BTreeMap<String, Option<String>> {
    let mut patch: BTreeMap<String, Option<String>> = desired
        .iter()
        .filter(|(k, v)| prior.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), Some(v.clone())))
        .collect();
    for key in prior.keys().filter(|k| !desired.contains_key(*k)) {
        patch.insert(key.clone(), None);
    }
    patch
}
