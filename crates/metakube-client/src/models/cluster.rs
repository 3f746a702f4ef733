//! Cluster models
//!
//! The cloud spec is a wire-level one-of: every provider has its own optional
//! field and the server expects exactly one of them to be set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cluster ID
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Display name
    pub name: String,

    /// Cluster labels, including the ones inherited from the project
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Cluster type, always `kubernetes` for MetaKube
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub cluster_type: String,

    /// Desired configuration
    pub spec: ClusterSpec,

    /// Observed state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterStatus>,

    /// When the cluster was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    /// When deletion of the cluster started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

/// Observed cluster state
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Version the control plane currently runs
    #[serde(default)]
    pub version: String,

    /// API server URL
    #[serde(default)]
    pub url: String,
}

/// Desired cluster configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cloud provider configuration
    pub cloud: CloudSpec,

    /// Kubernetes control plane version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Maintenance window for automatic updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_window: Option<UpdateWindow>,

    /// Static networks for machines (vSphere-style setups)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_networks: Vec<MachineNetwork>,

    /// Kubernetes audit logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_logging: Option<AuditLoggingSettings>,

    /// Enables the PodSecurityPolicy admission plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_pod_security_policy_admission_plugin: Option<bool>,

    /// Enables the PodNodeSelector admission plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_pod_node_selector_admission_plugin: Option<bool>,

    /// Additional admission plugins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admission_plugins: Vec<String>,

    /// Deploys the user SSH key agent into the cluster
    #[serde(
        rename = "enableUserSSHKeyAgent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_user_ssh_key_agent: Option<bool>,

    /// Pod and service networking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_network: Option<ClusterNetworkingConfig>,

    /// CNI plugin selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni_plugin: Option<CniPluginSettings>,
}

/// Cloud one-of plus the datacenter the cluster lives in
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CloudSpec {
    /// Datacenter name
    #[serde(rename = "dc", default, skip_serializing_if = "String::is_empty")]
    pub datacenter: String,

    /// Amazon Web Services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsCloudSpec>,

    /// OpenStack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<OpenstackCloudSpec>,

    /// Microsoft Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureCloudSpec>,

    /// Machines provisioned by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bringyourown: Option<BringYourOwnCloudSpec>,
}

/// AWS cluster settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AwsCloudSpec {
    #[serde(rename = "accessKeyId", default, skip_serializing_if = "String::is_empty")]
    pub access_key_id: String,
    #[serde(rename = "secretAccessKey", default, skip_serializing_if = "String::is_empty")]
    pub secret_access_key: String,
    #[serde(rename = "vpcId", default, skip_serializing_if = "String::is_empty")]
    pub vpc_id: String,
    #[serde(rename = "securityGroupID", default, skip_serializing_if = "String::is_empty")]
    pub security_group_id: String,
    #[serde(rename = "routeTableId", default, skip_serializing_if = "String::is_empty")]
    pub route_table_id: String,
    #[serde(rename = "instanceProfileName", default, skip_serializing_if = "String::is_empty")]
    pub instance_profile_name: String,
    #[serde(rename = "roleARN", default, skip_serializing_if = "String::is_empty")]
    pub role_arn: String,
    #[serde(rename = "openstackBillingTenant", default, skip_serializing_if = "String::is_empty")]
    pub openstack_billing_tenant: String,
}

/// OpenStack cluster settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct OpenstackCloudSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    #[serde(rename = "tenantID", default, skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(rename = "applicationCredentialID", default, skip_serializing_if = "String::is_empty")]
    pub application_credential_id: String,
    #[serde(rename = "applicationCredentialSecret", default, skip_serializing_if = "String::is_empty")]
    pub application_credential_secret: String,
    #[serde(rename = "floatingIpPool", default, skip_serializing_if = "String::is_empty")]
    pub floating_ip_pool: String,
    #[serde(rename = "securityGroups", default, skip_serializing_if = "String::is_empty")]
    pub security_groups: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(rename = "subnetID", default, skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,
    #[serde(rename = "subnetCIDR", default, skip_serializing_if = "String::is_empty")]
    pub subnet_cidr: String,
    #[serde(rename = "serverGroupID", default, skip_serializing_if = "String::is_empty")]
    pub server_group_id: String,
}

/// Azure cluster settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AzureCloudSpec {
    #[serde(rename = "clientID", default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(rename = "clientSecret", default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(rename = "subscriptionID", default, skip_serializing_if = "String::is_empty")]
    pub subscription_id: String,
    #[serde(rename = "tenantID", default, skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
    #[serde(rename = "resourceGroup", default, skip_serializing_if = "String::is_empty")]
    pub resource_group: String,
    #[serde(rename = "routeTable", default, skip_serializing_if = "String::is_empty")]
    pub route_table: String,
    #[serde(rename = "securityGroup", default, skip_serializing_if = "String::is_empty")]
    pub security_group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnet: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vnet: String,
    #[serde(rename = "availabilitySet", default, skip_serializing_if = "String::is_empty")]
    pub availability_set: String,
    #[serde(rename = "openstackBillingTenant", default, skip_serializing_if = "String::is_empty")]
    pub openstack_billing_tenant: String,
}

/// Bring-your-own machines; carries no settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct BringYourOwnCloudSpec {}

/// Maintenance window
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UpdateWindow {
    /// Start, e.g. `Tue 02:00`
    #[serde(default)]
    pub start: String,
    /// Duration, e.g. `2h`
    #[serde(default)]
    pub length: String,
}

/// Static machine network
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineNetwork {
    #[serde(rename = "CIDR", default)]
    pub cidr: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(rename = "dnsServers", default, skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,
}

/// Audit logging toggle
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AuditLoggingSettings {
    #[serde(default)]
    pub enabled: bool,
}

/// Pod and service networking
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<NetworkRanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<NetworkRanges>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dns_domain: String,
}

/// A list of CIDR blocks
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRanges {
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
}

/// CNI plugin selection
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CniPluginSettings {
    #[serde(rename = "type", default)]
    pub plugin_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Body for `POST /api/v2/projects/{project_id}/clusters`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    /// The cluster to create
    pub cluster: Cluster,
}

/// JSON merge patch for a cluster
///
/// A label mapped to `None` is serialized as `null`, which removes it. `spec`
/// is a merge patch of [`ClusterSpec`], see [`crate::patch::diff`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ClusterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
}

/// Health of a single control plane component
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(from = "i64", into = "i64")]
pub enum HealthStatus {
    /// Component is down
    #[default]
    Down,
    /// Component is up
    Up,
    /// Component is still being provisioned
    Provisioning,
}

impl From<i64> for HealthStatus {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Up,
            2 => Self::Provisioning,
            _ => Self::Down,
        }
    }
}

impl From<HealthStatus> for i64 {
    fn from(value: HealthStatus) -> Self {
        match value {
            HealthStatus::Down => 0,
            HealthStatus::Up => 1,
            HealthStatus::Provisioning => 2,
        }
    }
}

/// Health of the control plane components of a cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterHealth {
    #[serde(default)]
    pub apiserver: HealthStatus,
    #[serde(default)]
    pub controller: HealthStatus,
    #[serde(default)]
    pub etcd: HealthStatus,
    #[serde(default)]
    pub scheduler: HealthStatus,
    #[serde(default)]
    pub cloud_provider_infrastructure: HealthStatus,
    #[serde(default)]
    pub machine_controller: HealthStatus,
    #[serde(default)]
    pub user_cluster_controller_manager: HealthStatus,
}

impl ClusterHealth {
    /// Every component in the same state
    pub fn uniform(status: HealthStatus) -> Self {
        Self {
            apiserver: status,
            controller: status,
            etcd: status,
            scheduler: status,
            cloud_provider_infrastructure: status,
            machine_controller: status,
            user_cluster_controller_manager: status,
        }
    }

    /// Components as `(name, status)` pairs, in a stable order
    pub fn components(&self) -> [(&'static str, HealthStatus); 7] {
        [
            ("apiserver", self.apiserver),
            ("controller", self.controller),
            ("etcd", self.etcd),
            ("scheduler", self.scheduler),
            ("cloudProviderInfrastructure", self.cloud_provider_infrastructure),
            ("machineController", self.machine_controller),
            ("userClusterControllerManager", self.user_cluster_controller_manager),
        ]
    }

    /// Components that are not up yet
    pub fn pending_components(&self) -> Vec<&'static str> {
        self.components()
            .into_iter()
            .filter(|(_, status)| *status != HealthStatus::Up)
            .map(|(name, _)| name)
            .collect()
    }

    /// True when every component reports up
    pub fn all_up(&self) -> bool {
        self.pending_components().is_empty()
    }
}
