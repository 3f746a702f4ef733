//! Datacenters, provider network listings and offered versions

use serde::{Deserialize, Serialize};

/// A datacenter clusters can be placed in
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Datacenter {
    pub metadata: DatacenterMeta,
    pub spec: DatacenterSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DatacenterMeta {
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DatacenterSpec {
    /// Seed cluster hosting the control planes
    #[serde(default)]
    pub seed: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub location: String,
    /// Provider name, e.g. `openstack` or `aws`
    #[serde(default)]
    pub provider: String,
}

/// Credentials sent as headers when listing OpenStack resources
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpenstackCredentials {
    pub datacenter: String,
    pub domain: String,
    pub tenant: String,
    pub tenant_id: String,
    pub username: String,
    pub password: String,
    pub application_credential_id: String,
    pub application_credential_secret: String,
}

impl OpenstackCredentials {
    /// Header name/value pairs, skipping empty values
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        [
            ("DatacenterName", self.datacenter.as_str()),
            ("Domain", self.domain.as_str()),
            ("Tenant", self.tenant.as_str()),
            ("TenantID", self.tenant_id.as_str()),
            ("Username", self.username.as_str()),
            ("Password", self.password.as_str()),
            ("ApplicationCredentialID", self.application_credential_id.as_str()),
            ("ApplicationCredentialSecret", self.application_credential_secret.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .collect()
    }
}

/// An OpenStack network
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct OpenstackNetwork {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external: bool,
}

/// An OpenStack subnet
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct OpenstackSubnet {
    pub id: String,
    pub name: String,
}

/// A Kubernetes version offered by the platform
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterVersion {
    pub version: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub restricted_by_kubelet_version: bool,
}
