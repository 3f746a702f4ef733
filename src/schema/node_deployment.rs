use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ProviderKind;

/// Replica count used when `replicas` is not set
pub const DEFAULT_REPLICAS: i32 = 1;

/// `metakube_node_deployment` configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeDeploymentConfig {
    /// Discovered from the cluster when empty
    #[serde(default)]
    pub project_id: String,
    pub cluster_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "crate::schema::one_block")]
    pub spec: NodeDeploymentSpecConfig,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeDeploymentSpecConfig {
    #[serde(default)]
    pub replicas: Option<i32>,
    #[serde(default)]
    pub min_replicas: Option<i32>,
    #[serde(default)]
    pub max_replicas: Option<i32>,
    #[serde(default)]
    pub dynamic_config: Option<bool>,
    #[serde(with = "crate::schema::one_block")]
    pub template: NodeSpecConfig,
}

impl NodeDeploymentSpecConfig {
    pub fn replicas_or_default(&self) -> i32 {
        self.replicas.unwrap_or(DEFAULT_REPLICAS)
    }
}

/// The node `template` block
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeSpecConfig {
    #[serde(with = "crate::schema::one_block")]
    pub cloud: NodeCloudConfig,
    #[serde(with = "crate::schema::block", default)]
    pub operating_system: Option<OperatingSystemConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub versions: Option<NodeVersionsConfig>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub taints: Vec<TaintConfig>,
}

impl NodeSpecConfig {
    /// Kubelet version, if one was requested
    pub fn kubelet(&self) -> Option<&str> {
        self.versions
            .as_ref()
            .map(|v| v.kubelet.as_str())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeVersionsConfig {
    #[serde(default)]
    pub kubelet: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaintConfig {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub effect: String,
}

/// The node `cloud` block: one optional block per provider
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeCloudConfig {
    #[serde(with = "crate::schema::block", default)]
    pub aws: Option<AwsNodeConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub openstack: Option<OpenstackNodeConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub azure: Option<AzureNodeConfig>,
}

impl NodeCloudConfig {
    /// Providers whose block is present, in attribute order
    pub fn populated(&self) -> Vec<ProviderKind> {
        let mut kinds = Vec::new();
        if self.aws.is_some() {
            kinds.push(ProviderKind::Aws);
        }
        if self.openstack.is_some() {
            kinds.push(ProviderKind::Openstack);
        }
        if self.azure.is_some() {
            kinds.push(ProviderKind::Azure);
        }
        kinds
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AwsNodeConfig {
    pub instance_type: String,
    #[serde(default)]
    pub disk_size: i64,
    #[serde(default)]
    pub volume_type: String,
    #[serde(default)]
    pub ami: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub assign_public_ip: Option<bool>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OpenstackNodeConfig {
    pub flavor: String,
    pub image: String,
    #[serde(default)]
    pub disk_size: Option<i64>,
    #[serde(default)]
    pub use_floating_ip: Option<bool>,
    #[serde(default)]
    pub instance_ready_check_period: String,
    #[serde(default)]
    pub instance_ready_check_timeout: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AzureNodeConfig {
    pub size: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub assign_public_ip: bool,
    #[serde(default)]
    pub disk_size_gb: i32,
    #[serde(default)]
    pub os_disk_size_gb: i32,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// The `operating_system` block: at most one distribution
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OperatingSystemConfig {
    #[serde(with = "crate::schema::block", default)]
    pub ubuntu: Option<UbuntuConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub flatcar: Option<FlatcarConfig>,
    #[serde(with = "crate::schema::block", default)]
    pub centos: Option<CentosConfig>,
}

impl OperatingSystemConfig {
    /// Names of the distributions whose block is present
    pub fn populated(&self) -> Vec<&'static str> {
        [
            ("ubuntu", self.ubuntu.is_some()),
            ("flatcar", self.flatcar.is_some()),
            ("centos", self.centos.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UbuntuConfig {
    #[serde(default)]
    pub dist_upgrade_on_boot: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FlatcarConfig {
    #[serde(default)]
    pub disable_auto_update: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CentosConfig {
    #[serde(default)]
    pub dist_upgrade_on_boot: bool,
}

/// `metakube_node_deployment` state
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeDeploymentState {
    pub id: String,
    #[serde(flatten)]
    pub config: NodeDeploymentConfig,
    #[serde(default)]
    pub creation_timestamp: String,
    #[serde(default)]
    pub deletion_timestamp: String,
}
