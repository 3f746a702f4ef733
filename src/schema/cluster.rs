use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::ProviderKind;

/// `metakube_cluster` configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterConfig {
    pub project_id: String,
    pub dc_name: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub sshkeys: BTreeSet<String>,
    #[serde(with = "crate::schema::one_block")]
    pub spec: ClusterSpecConfig,
}

/// The `spec` block of a cluster
///
/// Empty strings and `None` mean "let the server decide".
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterSpecConfig {
    pub version: String,
    #[serde(default)]
    pub enable_ssh_agent: Option<bool>,
    #[serde(with = "crate::schema::block", default)]
    pub update_window: Option<UpdateWindowConfig>,
    #[serde(with = "crate::schema::one_block")]
    pub cloud: ClusterCloudConfig,
    #[serde(default)]
    pub machine_networks: Vec<MachineNetworkConfig>,
    #[serde(default)]
    pub audit_logging: bool,
    #[serde(default)]
    pub pod_security_policy: bool,
    #[serde(default)]
    pub pod_node_selector: bool,
    #[serde(default)]
    pub admission_plugins: BTreeSet<String>,
    #[serde(default)]
    pub services_cidr: String,
    #[serde(default)]
    pub pods_cidr: String,
    #[serde(default)]
    pub domain_name: String,
    #[serde(with = "crate::schema::block", default)]
    pub cni_plugin: Option<CniPluginConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UpdateWindowConfig {
    pub start: String,
    pub length: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MachineNetworkConfig {
    pub cidr: String,
    pub gateway: String,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CniPluginConfig {
    #[serde(rename = "type")]
    pub plugin_type: String,
}

/// The `cloud` block exactly as written: one optional block per provider
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterCloudConfig {
    #[serde(with = "crate::schema::block", default)]
    pub aws: Option<AwsCloudConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub openstack: Option<OpenstackCloudConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub azure: Option<AzureCloudConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub bringyourown: Option<BringYourOwnCloudConfig>,
}

impl ClusterCloudConfig {
    /// Providers whose block is present, in attribute order
    pub fn populated(&self) -> Vec<ProviderKind> {
        let present = [
            self.aws.is_some(),
            self.openstack.is_some(),
            self.azure.is_some(),
            self.bringyourown.is_some(),
        ];
        ProviderKind::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(kind, set)| set.then_some(kind))
            .collect()
    }
}

impl From<CloudProvider> for ClusterCloudConfig {
    fn from(provider: CloudProvider) -> Self {
        match provider {
            CloudProvider::Aws(aws) => Self {
                aws: Some(aws),
                ..Default::default()
            },
            CloudProvider::Openstack(openstack) => Self {
                openstack: Some(openstack),
                ..Default::default()
            },
            CloudProvider::Azure(azure) => Self {
                azure: Some(azure),
                ..Default::default()
            },
            CloudProvider::BringYourOwn => Self {
                bringyourown: Some(BringYourOwnCloudConfig::default()),
                ..Default::default()
            },
        }
    }
}

/// A cloud block that passed the exclusivity check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloudProvider {
    Aws(AwsCloudConfig),
    Openstack(OpenstackCloudConfig),
    Azure(AzureCloudConfig),
    BringYourOwn,
}

impl CloudProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Aws(_) => ProviderKind::Aws,
            Self::Openstack(_) => ProviderKind::Openstack,
            Self::Azure(_) => ProviderKind::Azure,
            Self::BringYourOwn => ProviderKind::BringYourOwn,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AwsCloudConfig {
    /// Never returned by the API
    #[serde(default)]
    pub access_key_id: String,
    /// Never returned by the API
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub security_group_id: String,
    #[serde(default)]
    pub route_table_id: String,
    #[serde(default)]
    pub instance_profile_name: String,
    #[serde(default)]
    pub role_arn: String,
    #[serde(default)]
    pub openstack_billing_tenant: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OpenstackCloudConfig {
    // Credentials are never returned by the API.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub application_credential_id: String,
    #[serde(default)]
    pub application_credential_secret: String,

    #[serde(default)]
    pub floating_ip_pool: String,
    #[serde(default)]
    pub security_group: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub subnet_cidr: String,
    #[serde(default)]
    pub server_group_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AzureCloudConfig {
    // Credentials are never returned by the API.
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub tenant_id: String,

    #[serde(default)]
    pub resource_group: String,
    #[serde(default)]
    pub route_table: String,
    #[serde(default)]
    pub security_group: String,
    #[serde(default)]
    pub subnet: String,
    #[serde(default)]
    pub vnet: String,
    #[serde(default)]
    pub availability_set: String,
    #[serde(default)]
    pub openstack_billing_tenant: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BringYourOwnCloudConfig {}

/// `metakube_cluster` state
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterState {
    pub id: String,
    #[serde(flatten)]
    pub config: ClusterConfig,
    /// Admin kubeconfig
    #[serde(default)]
    pub kube_config: String,
    #[serde(default)]
    pub creation_timestamp: String,
    #[serde(default)]
    pub deletion_timestamp: String,
}
