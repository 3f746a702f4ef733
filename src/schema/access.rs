use serde::{Deserialize, Serialize};

/// Groups a service account can be bound to
pub const SERVICE_ACCOUNT_GROUPS: [&str; 2] = ["editors", "viewers"];

/// `metakube_sshkey` configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SshKeyConfig {
    pub project_id: String,
    pub name: String,
    pub public_key: String,
}

impl SshKeyConfig {
    /// Compare public keys ignoring surrounding whitespace
    pub fn same_key(&self, other: &str) -> bool {
        self.public_key.trim() == other.trim()
    }
}

/// `metakube_sshkey` state
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SshKeyState {
    pub id: String,
    #[serde(flatten)]
    pub config: SshKeyConfig,
    #[serde(default)]
    pub fingerprint: String,
}

/// `metakube_service_account` configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceAccountConfig {
    pub project_id: String,
    pub name: String,
    pub group: String,
}

/// `metakube_service_account` state; `id` is `project_id:service_account_id`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceAccountState {
    pub id: String,
    #[serde(flatten)]
    pub config: ServiceAccountConfig,
    #[serde(default)]
    pub creation_timestamp: String,
}

/// `metakube_service_account_token` configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenConfig {
    /// ID of the owning `metakube_service_account`
    pub service_account_id: String,
    pub name: String,
}

/// `metakube_service_account_token` state; `id` is
/// `project_id:service_account_id:token_id`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenState {
    pub id: String,
    #[serde(flatten)]
    pub config: TokenConfig,
    /// Only returned when the token is created
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub creation_timestamp: String,
}
