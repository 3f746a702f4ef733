//! Node deployment (machine deployment) models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A set of worker nodes sharing one template
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDeployment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub spec: NodeDeploymentSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeDeploymentStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

/// Desired node deployment state
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDeploymentSpec {
    #[serde(default)]
    pub replicas: i32,

    /// Lower autoscaler bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    /// Upper autoscaler bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    pub template: NodeSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,

    /// Uses the dynamic kubelet config feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_config: Option<bool>,
}

/// Observed node deployment state
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDeploymentStatus {
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub updated_replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
    #[serde(default)]
    pub available_replicas: i32,
    #[serde(default)]
    pub unavailable_replicas: i32,
}

/// Template shared by all nodes of a deployment
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub cloud: NodeCloudSpec,

    pub operating_system: OperatingSystemSpec,

    #[serde(default)]
    pub versions: NodeVersionInfo,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<TaintSpec>,
}

/// Per-provider node settings; exactly one must be set
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct NodeCloudSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsNodeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<OpenstackNodeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureNodeSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AwsNodeSpec {
    #[serde(rename = "instanceType", default)]
    pub instance_type: String,
    #[serde(rename = "diskSize", default)]
    pub disk_size: i64,
    #[serde(rename = "volumeType", default)]
    pub volume_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ami: String,
    #[serde(rename = "availabilityZone", default, skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,
    #[serde(rename = "subnetID", default, skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,
    #[serde(rename = "assignPublicIP", default, skip_serializing_if = "Option::is_none")]
    pub assign_public_ip: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct OpenstackNodeSpec {
    #[serde(default)]
    pub flavor: String,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "diskSize", default, skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<i64>,
    #[serde(rename = "useFloatingIP", default, skip_serializing_if = "Option::is_none")]
    pub use_floating_ip: Option<bool>,
    #[serde(rename = "instanceReadyCheckPeriod", default, skip_serializing_if = "String::is_empty")]
    pub instance_ready_check_period: String,
    #[serde(rename = "instanceReadyCheckTimeout", default, skip_serializing_if = "String::is_empty")]
    pub instance_ready_check_timeout: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AzureNodeSpec {
    #[serde(default)]
    pub size: String,
    #[serde(rename = "imageID", default, skip_serializing_if = "String::is_empty")]
    pub image_id: String,
    #[serde(rename = "assignPublicIP", default)]
    pub assign_public_ip: bool,
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "is_zero")]
    pub disk_size_gb: i32,
    #[serde(rename = "osDiskSizeGB", default, skip_serializing_if = "is_zero")]
    pub os_disk_size_gb: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

/// Operating system one-of
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct OperatingSystemSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ubuntu: Option<UbuntuSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatcar: Option<FlatcarSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centos: Option<CentosSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UbuntuSpec {
    #[serde(rename = "distUpgradeOnBoot", default)]
    pub dist_upgrade_on_boot: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FlatcarSpec {
    #[serde(rename = "disableAutoUpdate", default)]
    pub disable_auto_update: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CentosSpec {
    #[serde(rename = "distUpgradeOnBoot", default)]
    pub dist_upgrade_on_boot: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct NodeVersionInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kubelet: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaintSpec {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub effect: String,
}

/// JSON merge patch for a node deployment
///
/// `spec` is a merge patch of [`NodeDeploymentSpec`], see
/// [`crate::patch::diff`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct NodeDeploymentPatch {
    pub spec: serde_json::Value,
}
