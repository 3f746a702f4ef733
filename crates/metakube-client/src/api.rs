//! The MetaKube API surface used by the provider
//!
//! Every method is a single HTTP round trip. The trait exists so the provider
//! logic can run against a mock or an in-memory fake in tests while production
//! code talks to the real service through [`crate::HttpClient`].

use async_trait::async_trait;

#[cfg(any(test, feature = "mock"))]
use mockall::automock;

use crate::error::ApiError;
use crate::models::*;

/// Result of an API call
pub type ApiResult<T> = Result<T, ApiError>;

/// Operations on the MetaKube control-plane API
#[cfg_attr(any(test, feature = "mock"), automock)]
#[async_trait]
pub trait MetakubeApi: Send + Sync {
    // Projects

    /// List all projects visible to the caller
    async fn list_projects(&self) -> ApiResult<Vec<Project>>;
    /// Get one project
    async fn get_project(&self, project_id: &str) -> ApiResult<Project>;
    /// Create a project
    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<Project>;
    /// Replace a project's name and labels
    async fn update_project(&self, project_id: &str, project: &Project) -> ApiResult<Project>;
    /// Delete a project
    async fn delete_project(&self, project_id: &str) -> ApiResult<()>;

    // Project members

    /// List members of a project
    async fn list_project_users(&self, project_id: &str) -> ApiResult<Vec<User>>;
    /// Add a member to a project
    async fn add_user_to_project(&self, project_id: &str, user: &User) -> ApiResult<User>;
    /// Change a member's group
    async fn edit_user_in_project(
        &self,
        project_id: &str,
        user_id: &str,
        user: &User,
    ) -> ApiResult<User>;
    /// Remove a member from a project
    async fn delete_user_from_project(&self, project_id: &str, user_id: &str) -> ApiResult<()>;

    // Clusters

    /// List clusters of a project
    async fn list_clusters(&self, project_id: &str) -> ApiResult<Vec<Cluster>>;
    /// Get one cluster
    async fn get_cluster(&self, project_id: &str, cluster_id: &str) -> ApiResult<Cluster>;
    /// Create a cluster
    async fn create_cluster(
        &self,
        project_id: &str,
        request: &CreateClusterRequest,
    ) -> ApiResult<Cluster>;
    /// Apply a JSON merge patch to a cluster
    async fn patch_cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
        patch: &ClusterPatch,
    ) -> ApiResult<Cluster>;
    /// Delete a cluster
    async fn delete_cluster(&self, project_id: &str, cluster_id: &str) -> ApiResult<()>;
    /// Control plane component health
    async fn get_cluster_health(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<ClusterHealth>;
    /// Admin kubeconfig of a cluster
    async fn get_cluster_kubeconfig(&self, project_id: &str, cluster_id: &str)
        -> ApiResult<String>;

    // SSH keys

    /// List SSH keys of a project
    async fn list_ssh_keys(&self, project_id: &str) -> ApiResult<Vec<SshKey>>;
    /// Create an SSH key
    async fn create_ssh_key(&self, project_id: &str, key: &SshKey) -> ApiResult<SshKey>;
    /// Delete an SSH key
    async fn delete_ssh_key(&self, project_id: &str, key_id: &str) -> ApiResult<()>;
    /// List SSH keys assigned to a cluster
    async fn list_cluster_ssh_keys(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<Vec<SshKey>>;
    /// Assign an SSH key to a cluster
    async fn assign_ssh_key_to_cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
        key_id: &str,
    ) -> ApiResult<()>;
    /// Remove an SSH key from a cluster
    async fn detach_ssh_key_from_cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
        key_id: &str,
    ) -> ApiResult<()>;

    // Node deployments

    /// List node deployments of a cluster
    async fn list_node_deployments(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<Vec<NodeDeployment>>;
    /// Get one node deployment
    async fn get_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
    ) -> ApiResult<NodeDeployment>;
    /// Create a node deployment
    async fn create_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment: &NodeDeployment,
    ) -> ApiResult<NodeDeployment>;
    /// Apply a JSON merge patch to a node deployment
    async fn patch_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
        patch: &NodeDeploymentPatch,
    ) -> ApiResult<NodeDeployment>;
    /// Delete a node deployment
    async fn delete_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
    ) -> ApiResult<()>;

    // Service accounts

    /// List service accounts of a project
    async fn list_service_accounts(&self, project_id: &str) -> ApiResult<Vec<ServiceAccount>>;
    /// Create a service account
    async fn create_service_account(
        &self,
        project_id: &str,
        service_account: &ServiceAccount,
    ) -> ApiResult<ServiceAccount>;
    /// Update a service account's name and group
    async fn update_service_account(
        &self,
        project_id: &str,
        service_account_id: &str,
        service_account: &ServiceAccount,
    ) -> ApiResult<ServiceAccount>;
    /// Delete a service account
    async fn delete_service_account(
        &self,
        project_id: &str,
        service_account_id: &str,
    ) -> ApiResult<()>;

    // Service account tokens

    /// List tokens of a service account
    async fn list_service_account_tokens(
        &self,
        project_id: &str,
        service_account_id: &str,
    ) -> ApiResult<Vec<ServiceAccountToken>>;
    /// Create a token; the response carries the token value
    async fn create_service_account_token(
        &self,
        project_id: &str,
        service_account_id: &str,
        request: &TokenNameRequest,
    ) -> ApiResult<ServiceAccountToken>;
    /// Rename a token
    async fn patch_service_account_token(
        &self,
        project_id: &str,
        service_account_id: &str,
        token_id: &str,
        request: &TokenNameRequest,
    ) -> ApiResult<ServiceAccountToken>;
    /// Delete a token
    async fn delete_service_account_token(
        &self,
        project_id: &str,
        service_account_id: &str,
        token_id: &str,
    ) -> ApiResult<()>;

    // Platform metadata

    /// List datacenters
    async fn list_datacenters(&self) -> ApiResult<Vec<Datacenter>>;
    /// Get one datacenter
    async fn get_datacenter(&self, name: &str) -> ApiResult<Datacenter>;
    /// List OpenStack networks visible with the given credentials
    async fn list_openstack_networks(
        &self,
        credentials: &OpenstackCredentials,
    ) -> ApiResult<Vec<OpenstackNetwork>>;
    /// List subnets of an OpenStack network
    async fn list_openstack_subnets(
        &self,
        credentials: &OpenstackCredentials,
        network_id: &str,
    ) -> ApiResult<Vec<OpenstackSubnet>>;
    /// Control plane versions offered for new clusters
    async fn list_master_versions(&self) -> ApiResult<Vec<MasterVersion>>;
    /// Kubelet versions compatible with a control plane version
    async fn list_node_upgrades(&self, control_plane_version: &str)
        -> ApiResult<Vec<MasterVersion>>;
}
