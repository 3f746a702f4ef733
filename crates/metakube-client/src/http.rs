//! reqwest-backed implementation of [`MetakubeApi`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::api::{ApiResult, MetakubeApi};
use crate::error::ApiError;
use crate::models::*;

/// Default timeout for a single API request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Content type used by JSON merge patches
const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

/// Authenticated client for the MetaKube REST API
#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    token: String,
    http: reqwest::Client,
}

impl HttpClient {
    /// Create a client for `host` authenticating with a bearer `token`
    pub fn new(host: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(host, token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(
        host: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut base = Url::parse(host)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("metakube-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                operation: "buildClient",
                source,
            })?;
        Ok(Self {
            base,
            token: token.into(),
            http,
        })
    }

    /// Base URL every API path is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build a request for `path`, percent-encoding every segment
    fn request(&self, method: Method, path: &[&str]) -> ApiResult<RequestBuilder> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(path);
        trace!(%method, %url, "MetaKube API request");
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    async fn execute(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> ApiResult<String> {
        let response = builder
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;

        if !status.is_success() {
            debug!(operation, status = status.as_u16(), "MetaKube API call failed");
            return Err(ApiError::status(operation, status.as_u16(), body));
        }
        Ok(body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> ApiResult<T> {
        let body = self.execute(operation, builder).await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { operation, source })
    }

    async fn call_empty(&self, operation: &'static str, builder: RequestBuilder) -> ApiResult<()> {
        self.execute(operation, builder).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, operation: &'static str, path: &[&str]) -> ApiResult<T> {
        let builder = self.request(Method::GET, path)?;
        self.call(operation, builder).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &[&str],
        body: &B,
    ) -> ApiResult<T> {
        let builder = self.request(method, path)?.json(body);
        self.call(operation, builder).await
    }

    async fn merge_patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &[&str],
        body: &B,
    ) -> ApiResult<T> {
        let payload =
            serde_json::to_vec(body).map_err(|source| ApiError::Encode { operation, source })?;
        let builder = self
            .request(Method::PATCH, path)?
            .header(reqwest::header::CONTENT_TYPE, MERGE_PATCH_CONTENT_TYPE)
            .body(payload);
        self.call(operation, builder).await
    }

    async fn delete(&self, operation: &'static str, path: &[&str]) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, path)?;
        self.call_empty(operation, builder).await
    }
}

#[async_trait]
impl MetakubeApi for HttpClient {
    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        self.get("listProjects", &["api", "v1", "projects"]).await
    }

    async fn get_project(&self, project_id: &str) -> ApiResult<Project> {
        self.get("getProject", &["api", "v1", "projects", project_id])
            .await
    }

    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<Project> {
        self.send_json("createProject", Method::POST, &["api", "v1", "projects"], request)
            .await
    }

    async fn update_project(&self, project_id: &str, project: &Project) -> ApiResult<Project> {
        self.send_json(
            "updateProject",
            Method::PUT,
            &["api", "v1", "projects", project_id],
            project,
        )
        .await
    }

    async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        self.delete("deleteProject", &["api", "v1", "projects", project_id])
            .await
    }

    async fn list_project_users(&self, project_id: &str) -> ApiResult<Vec<User>> {
        self.get(
            "getUsersForProject",
            &["api", "v1", "projects", project_id, "users"],
        )
        .await
    }

    async fn add_user_to_project(&self, project_id: &str, user: &User) -> ApiResult<User> {
        self.send_json(
            "addUserToProject",
            Method::POST,
            &["api", "v1", "projects", project_id, "users"],
            user,
        )
        .await
    }

    async fn edit_user_in_project(
        &self,
        project_id: &str,
        user_id: &str,
        user: &User,
    ) -> ApiResult<User> {
        self.send_json(
            "editUserInProject",
            Method::PUT,
            &["api", "v1", "projects", project_id, "users", user_id],
            user,
        )
        .await
    }

    async fn delete_user_from_project(&self, project_id: &str, user_id: &str) -> ApiResult<()> {
        self.delete(
            "deleteUserFromProject",
            &["api", "v1", "projects", project_id, "users", user_id],
        )
        .await
    }

    async fn list_clusters(&self, project_id: &str) -> ApiResult<Vec<Cluster>> {
        self.get(
            "listClustersV2",
            &["api", "v2", "projects", project_id, "clusters"],
        )
        .await
    }

    async fn get_cluster(&self, project_id: &str, cluster_id: &str) -> ApiResult<Cluster> {
        self.get(
            "getClusterV2",
            &["api", "v2", "projects", project_id, "clusters", cluster_id],
        )
        .await
    }

    async fn create_cluster(
        &self,
        project_id: &str,
        request: &CreateClusterRequest,
    ) -> ApiResult<Cluster> {
        self.send_json(
            "createClusterV2",
            Method::POST,
            &["api", "v2", "projects", project_id, "clusters"],
            request,
        )
        .await
    }

    async fn patch_cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
        patch: &ClusterPatch,
    ) -> ApiResult<Cluster> {
        self.merge_patch(
            "patchClusterV2",
            &["api", "v2", "projects", project_id, "clusters", cluster_id],
            patch,
        )
        .await
    }

    async fn delete_cluster(&self, project_id: &str, cluster_id: &str) -> ApiResult<()> {
        self.delete(
            "deleteClusterV2",
            &["api", "v2", "projects", project_id, "clusters", cluster_id],
        )
        .await
    }

    async fn get_cluster_health(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<ClusterHealth> {
        self.get(
            "getClusterHealthV2",
            &["api", "v2", "projects", project_id, "clusters", cluster_id, "health"],
        )
        .await
    }

    async fn get_cluster_kubeconfig(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<String> {
        let builder = self.request(
            Method::GET,
            &["api", "v2", "projects", project_id, "clusters", cluster_id, "kubeconfig"],
        )?;
        self.execute("getClusterKubeconfigV2", builder).await
    }

    async fn list_ssh_keys(&self, project_id: &str) -> ApiResult<Vec<SshKey>> {
        self.get(
            "listSSHKeys",
            &["api", "v1", "projects", project_id, "sshkeys"],
        )
        .await
    }

    async fn create_ssh_key(&self, project_id: &str, key: &SshKey) -> ApiResult<SshKey> {
        self.send_json(
            "createSSHKey",
            Method::POST,
            &["api", "v1", "projects", project_id, "sshkeys"],
            key,
        )
        .await
    }

    async fn delete_ssh_key(&self, project_id: &str, key_id: &str) -> ApiResult<()> {
        self.delete(
            "deleteSSHKey",
            &["api", "v1", "projects", project_id, "sshkeys", key_id],
        )
        .await
    }

    async fn list_cluster_ssh_keys(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<Vec<SshKey>> {
        self.get(
            "listSSHKeysAssignedToClusterV2",
            &["api", "v2", "projects", project_id, "clusters", cluster_id, "sshkeys"],
        )
        .await
    }

    async fn assign_ssh_key_to_cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
        key_id: &str,
    ) -> ApiResult<()> {
        let builder = self.request(
            Method::PUT,
            &["api", "v2", "projects", project_id, "clusters", cluster_id, "sshkeys", key_id],
        )?;
        self.call_empty("assignSSHKeyToClusterV2", builder).await
    }

    async fn detach_ssh_key_from_cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
        key_id: &str,
    ) -> ApiResult<()> {
        self.delete(
            "detachSSHKeyFromClusterV2",
            &["api", "v2", "projects", project_id, "clusters", cluster_id, "sshkeys", key_id],
        )
        .await
    }

    async fn list_node_deployments(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<Vec<NodeDeployment>> {
        self.get(
            "listMachineDeployments",
            &["api", "v2", "projects", project_id, "clusters", cluster_id, "machinedeployments"],
        )
        .await
    }

    async fn get_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
    ) -> ApiResult<NodeDeployment> {
        self.get(
            "getMachineDeployment",
            &[
                "api",
                "v2",
                "projects",
                project_id,
                "clusters",
                cluster_id,
                "machinedeployments",
                node_deployment_id,
            ],
        )
        .await
    }

    async fn create_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment: &NodeDeployment,
    ) -> ApiResult<NodeDeployment> {
        self.send_json(
            "createMachineDeployment",
            Method::POST,
            &["api", "v2", "projects", project_id, "clusters", cluster_id, "machinedeployments"],
            node_deployment,
        )
        .await
    }

    async fn patch_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
        patch: &NodeDeploymentPatch,
    ) -> ApiResult<NodeDeployment> {
        self.merge_patch(
            "patchMachineDeployment",
            &[
                "api",
                "v2",
                "projects",
                project_id,
                "clusters",
                cluster_id,
                "machinedeployments",
                node_deployment_id,
            ],
            patch,
        )
        .await
    }

    async fn delete_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
    ) -> ApiResult<()> {
        self.delete(
            "deleteMachineDeployment",
            &[
                "api",
                "v2",
                "projects",
                project_id,
                "clusters",
                cluster_id,
                "machinedeployments",
                node_deployment_id,
            ],
        )
        .await
    }

    async fn list_service_accounts(&self, project_id: &str) -> ApiResult<Vec<ServiceAccount>> {
        self.get(
            "listServiceAccounts",
            &["api", "v1", "projects", project_id, "serviceaccounts"],
        )
        .await
    }

    async fn create_service_account(
        &self,
        project_id: &str,
        service_account: &ServiceAccount,
    ) -> ApiResult<ServiceAccount> {
        self.send_json(
            "addServiceAccountToProject",
            Method::POST,
            &["api", "v1", "projects", project_id, "serviceaccounts"],
            service_account,
        )
        .await
    }

    async fn update_service_account(
        &self,
        project_id: &str,
        service_account_id: &str,
        service_account: &ServiceAccount,
    ) -> ApiResult<ServiceAccount> {
        self.send_json(
            "updateServiceAccount",
            Method::PUT,
            &["api", "v1", "projects", project_id, "serviceaccounts", service_account_id],
            service_account,
        )
        .await
    }

    async fn delete_service_account(
        &self,
        project_id: &str,
        service_account_id: &str,
    ) -> ApiResult<()> {
        self.delete(
            "deleteServiceAccount",
            &["api", "v1", "projects", project_id, "serviceaccounts", service_account_id],
        )
        .await
    }

    async fn list_service_account_tokens(
        &self,
        project_id: &str,
        service_account_id: &str,
    ) -> ApiResult<Vec<ServiceAccountToken>> {
        self.get(
            "listServiceAccountTokens",
            &["api", "v1", "projects", project_id, "serviceaccounts", service_account_id, "tokens"],
        )
        .await
    }

    async fn create_service_account_token(
        &self,
        project_id: &str,
        service_account_id: &str,
        request: &TokenNameRequest,
    ) -> ApiResult<ServiceAccountToken> {
        self.send_json(
            "addTokenToServiceAccount",
            Method::POST,
            &["api", "v1", "projects", project_id, "serviceaccounts", service_account_id, "tokens"],
            request,
        )
        .await
    }

    async fn patch_service_account_token(
        &self,
        project_id: &str,
        service_account_id: &str,
        token_id: &str,
        request: &TokenNameRequest,
    ) -> ApiResult<ServiceAccountToken> {
        self.merge_patch(
            "patchServiceAccountToken",
            &[
                "api",
                "v1",
                "projects",
                project_id,
                "serviceaccounts",
                service_account_id,
                "tokens",
                token_id,
            ],
            request,
        )
        .await
    }

    async fn delete_service_account_token(
        &self,
        project_id: &str,
        service_account_id: &str,
        token_id: &str,
    ) -> ApiResult<()> {
        self.delete(
            "deleteServiceAccountToken",
            &[
                "api",
                "v1",
                "projects",
                project_id,
                "serviceaccounts",
                service_account_id,
                "tokens",
                token_id,
            ],
        )
        .await
    }

    async fn list_datacenters(&self) -> ApiResult<Vec<Datacenter>> {
        self.get("listDatacenters", &["api", "v1", "dc"]).await
    }

    async fn get_datacenter(&self, name: &str) -> ApiResult<Datacenter> {
        self.get("getDatacenter", &["api", "v1", "dc", name]).await
    }

    async fn list_openstack_networks(
        &self,
        credentials: &OpenstackCredentials,
    ) -> ApiResult<Vec<OpenstackNetwork>> {
        let mut builder = self.request(Method::GET, &[
            "api",
            "v1",
            "providers",
            "openstack",
            "networks",
        ])?;
        for (name, value) in credentials.headers() {
            builder = builder.header(name, value);
        }
        self.call("listOpenstackNetworks", builder).await
    }

    async fn list_openstack_subnets(
        &self,
        credentials: &OpenstackCredentials,
        network_id: &str,
    ) -> ApiResult<Vec<OpenstackSubnet>> {
        let mut builder = self
            .request(Method::GET, &["api", "v1", "providers", "openstack", "subnets"])?
            .query(&[("network_id", network_id)]);
        for (name, value) in credentials.headers() {
            builder = builder.header(name, value);
        }
        self.call("listOpenstackSubnets", builder).await
    }

    async fn list_master_versions(&self) -> ApiResult<Vec<MasterVersion>> {
        self.get("getMasterVersions", &["api", "v1", "upgrades", "cluster"]).await
    }

    async fn list_node_upgrades(
        &self,
        control_plane_version: &str,
    ) -> ApiResult<Vec<MasterVersion>> {
        let builder = self
            .request(Method::GET, &["api", "v1", "upgrades", "node"])?
            .query(&[("control_plane_version", control_plane_version)]);
        self.call("getNodeUpgrades", builder).await
    }
}
