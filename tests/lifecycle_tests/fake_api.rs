//! In-memory MetaKube API
//!
//! Behaves like the real service where the provider relies on it: projects
//! are active right away, clusters inherit project labels and never echo
//! credentials, service account groups carry a project suffix, token values
//! are only returned on creation, and node deployments bump their observed
//! generation on every write. Cluster networking left unset is defaulted on
//! creation, and patches are applied as JSON merge patches.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use metakube_client::models::*;
use metakube_client::{patch, ApiError, ApiResult, MetakubeApi};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Default)]
pub struct World {
    next_id: u32,
    pub projects: BTreeMap<String, Project>,
    pub members: BTreeMap<String, Vec<User>>,
    /// Keyed by cluster ID; the value remembers the owning project
    pub clusters: BTreeMap<String, (String, Cluster)>,
    pub cluster_keys: BTreeMap<String, BTreeSet<String>>,
    /// Keyed by `(cluster_id, node_deployment_id)`
    pub node_deployments: BTreeMap<(String, String), NodeDeployment>,
    pub ssh_keys: BTreeMap<String, Vec<SshKey>>,
    pub service_accounts: BTreeMap<String, Vec<ServiceAccount>>,
    pub tokens: BTreeMap<String, Vec<ServiceAccountToken>>,
    pub datacenters: Vec<Datacenter>,
    pub versions: Vec<MasterVersion>,
    pub networks: Vec<OpenstackNetwork>,
}

impl World {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

pub struct FakeApi {
    world: Mutex<World>,
}

fn not_found(operation: &'static str) -> ApiError {
    ApiError::status(
        operation,
        404,
        r#"{"error":{"code":404,"message":"resource not found"}}"#,
    )
}

/// Merge-patch a typed body through its JSON form
fn merge<T: Serialize + DeserializeOwned>(target: &mut T, changes: &serde_json::Value) {
    let mut doc = serde_json::to_value(&*target).expect("model serializes");
    patch::apply(&mut doc, changes);
    *target = serde_json::from_value(doc).expect("patched model deserializes");
}

/// Networking the service fills in when a cluster leaves it out
fn default_networking(spec: &mut ClusterSpec) {
    let network = spec.cluster_network.get_or_insert_with(Default::default);
    let ranges = |cidr: &str| NetworkRanges {
        cidr_blocks: vec![cidr.to_string()],
    };
    network.pods.get_or_insert_with(|| ranges("172.25.0.0/16"));
    network.services.get_or_insert_with(|| ranges("10.240.16.0/20"));
    if network.dns_domain.is_empty() {
        network.dns_domain = "cluster.local".to_string();
    }
}

fn strip_credentials(spec: &mut ClusterSpec) {
    if let Some(aws) = &mut spec.cloud.aws {
        aws.access_key_id.clear();
        aws.secret_access_key.clear();
    }
    if let Some(os) = &mut spec.cloud.openstack {
        os.username.clear();
        os.password.clear();
        os.tenant.clear();
        os.tenant_id.clear();
        os.domain.clear();
        os.application_credential_id.clear();
        os.application_credential_secret.clear();
    }
    if let Some(azure) = &mut spec.cloud.azure {
        azure.client_id.clear();
        azure.client_secret.clear();
        azure.subscription_id.clear();
        azure.tenant_id.clear();
    }
}

impl FakeApi {
    /// Two datacenters (`aws-eu-central-1a`, `dbl1` on OpenStack) and
    /// control plane versions 1.17.0 and 1.18.8
    pub fn new() -> Self {
        let datacenters = [("aws-eu-central-1a", "aws"), ("dbl1", "openstack")]
            .into_iter()
            .map(|(name, provider)| Datacenter {
                metadata: DatacenterMeta {
                    name: name.to_string(),
                },
                spec: DatacenterSpec {
                    provider: provider.to_string(),
                    ..Default::default()
                },
            })
            .collect();
        let versions = ["1.17.0", "1.18.8"]
            .into_iter()
            .map(|v| MasterVersion {
                version: v.to_string(),
                ..Default::default()
            })
            .collect();
        let networks = vec![
            OpenstackNetwork {
                id: "net-ext".to_string(),
                name: "ext-net".to_string(),
                external: true,
            },
            OpenstackNetwork {
                id: "net-int".to_string(),
                name: "int-net".to_string(),
                external: false,
            },
        ];
        Self {
            world: Mutex::new(World {
                datacenters,
                versions,
                networks,
                ..Default::default()
            }),
        }
    }

    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }
}

#[async_trait]
impl MetakubeApi for FakeApi {
    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        Ok(self.world().projects.values().cloned().collect())
    }

    async fn get_project(&self, project_id: &str) -> ApiResult<Project> {
        self.world()
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| not_found("getProject"))
    }

    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<Project> {
        let mut world = self.world();
        let id = world.id("p");
        let project = Project {
            id: id.clone(),
            name: request.name.clone(),
            labels: request.labels.clone(),
            status: ProjectStatus::Active,
            creation_timestamp: Some(Utc::now()),
            ..Default::default()
        };
        let creator = User {
            id: "u-creator".to_string(),
            email: "creator@example.com".to_string(),
            projects: vec![ProjectGroup {
                id: id.clone(),
                group: format!("owners-{id}"),
            }],
            ..Default::default()
        };
        world.members.insert(id.clone(), vec![creator]);
        world.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn update_project(&self, project_id: &str, project: &Project) -> ApiResult<Project> {
        let mut world = self.world();
        let existing = world
            .projects
            .get_mut(project_id)
            .ok_or_else(|| not_found("updateProject"))?;
        existing.name = project.name.clone();
        existing.labels = project.labels.clone();
        Ok(existing.clone())
    }

    async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        let mut world = self.world();
        world
            .projects
            .remove(project_id)
            .ok_or_else(|| not_found("deleteProject"))?;
        world.members.remove(project_id);
        Ok(())
    }

    async fn list_project_users(&self, project_id: &str) -> ApiResult<Vec<User>> {
        self.world()
            .members
            .get(project_id)
            .cloned()
            .ok_or_else(|| not_found("getUsersForProject"))
    }

    async fn add_user_to_project(&self, project_id: &str, user: &User) -> ApiResult<User> {
        let mut world = self.world();
        let id = world.id("u");
        let user = User {
            id,
            ..user.clone()
        };
        world
            .members
            .get_mut(project_id)
            .ok_or_else(|| not_found("addUserToProject"))?
            .push(user.clone());
        Ok(user)
    }

    async fn edit_user_in_project(
        &self,
        project_id: &str,
        user_id: &str,
        user: &User,
    ) -> ApiResult<User> {
        let mut world = self.world();
        let member = world
            .members
            .get_mut(project_id)
            .and_then(|m| m.iter_mut().find(|u| u.id == user_id))
            .ok_or_else(|| not_found("editUserInProject"))?;
        member.projects = user.projects.clone();
        Ok(member.clone())
    }

    async fn delete_user_from_project(&self, project_id: &str, user_id: &str) -> ApiResult<()> {
        let mut world = self.world();
        let members = world
            .members
            .get_mut(project_id)
            .ok_or_else(|| not_found("deleteUserFromProject"))?;
        members.retain(|u| u.id != user_id);
        Ok(())
    }

    async fn list_clusters(&self, project_id: &str) -> ApiResult<Vec<Cluster>> {
        Ok(self
            .world()
            .clusters
            .values()
            .filter(|(p, _)| p == project_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn get_cluster(&self, project_id: &str, cluster_id: &str) -> ApiResult<Cluster> {
        match self.world().clusters.get(cluster_id) {
            Some((p, c)) if p == project_id => Ok(c.clone()),
            _ => Err(not_found("getCluster")),
        }
    }

    async fn create_cluster(
        &self,
        project_id: &str,
        request: &CreateClusterRequest,
    ) -> ApiResult<Cluster> {
        let mut world = self.world();
        let project_labels = world
            .projects
            .get(project_id)
            .ok_or_else(|| not_found("createCluster"))?
            .labels
            .clone();
        let id = world.id("c");
        let mut cluster = request.cluster.clone();
        cluster.id = id.clone();
        cluster.creation_timestamp = Some(Utc::now());
        for (k, v) in project_labels {
            cluster.labels.entry(k).or_insert(v);
        }
        default_networking(&mut cluster.spec);
        strip_credentials(&mut cluster.spec);
        world
            .clusters
            .insert(id, (project_id.to_string(), cluster.clone()));
        Ok(cluster)
    }

    async fn patch_cluster(
        &self,
        project_id: &str,
        cluster_id: &str,
        patch: &ClusterPatch,
    ) -> ApiResult<Cluster> {
        let mut world = self.world();
        let cluster = match world.clusters.get_mut(cluster_id) {
            Some((p, c)) if p == project_id => c,
            _ => return Err(not_found("patchCluster")),
        };
        if let Some(name) = &patch.name {
            cluster.name = name.clone();
        }
        for (k, v) in &patch.labels {
            match v {
                Some(v) => cluster.labels.insert(k.clone(), v.clone()),
                None => cluster.labels.remove(k),
            };
        }
        if let Some(spec) = &patch.spec {
            merge(&mut cluster.spec, spec);
            strip_credentials(&mut cluster.spec);
        }
        Ok(cluster.clone())
    }

    async fn delete_cluster(&self, project_id: &str, cluster_id: &str) -> ApiResult<()> {
        let mut world = self.world();
        match world.clusters.get(cluster_id) {
            Some((p, _)) if p == project_id => {}
            _ => return Err(not_found("deleteCluster")),
        }
        world.clusters.remove(cluster_id);
        world.cluster_keys.remove(cluster_id);
        world.node_deployments.retain(|(c, _), _| c != cluster_id);
        Ok(())
    }

    async fn get_cluster_health(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<ClusterHealth> {
        self.get_cluster(project_id, cluster_id).await?;
        Ok(ClusterHealth::uniform(HealthStatus::Up))
    }

    async fn get_cluster_kubeconfig(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<String> {
        self.get_cluster(project_id, cluster_id).await?;
        Ok(format!("apiVersion: v1\nkind: Config\n# {cluster_id}\n"))
    }

    async fn list_ssh_keys(&self, project_id: &str) -> ApiResult<Vec<SshKey>> {
        Ok(self
            .world()
            .ssh_keys
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_ssh_key(&self, project_id: &str, key: &SshKey) -> ApiResult<SshKey> {
        let mut world = self.world();
        let id = world.id("key-");
        let key = SshKey {
            id: id.clone(),
            spec: SshKeySpec {
                fingerprint: format!("fp:{id}"),
                public_key: key.spec.public_key.clone(),
            },
            creation_timestamp: Some(Utc::now()),
            ..key.clone()
        };
        world
            .ssh_keys
            .entry(project_id.to_string())
            .or_default()
            .push(key.clone());
        Ok(key)
    }

    async fn delete_ssh_key(&self, project_id: &str, key_id: &str) -> ApiResult<()> {
        let mut world = self.world();
        let keys = world
            .ssh_keys
            .get_mut(project_id)
            .ok_or_else(|| not_found("deleteSSHKey"))?;
        keys.retain(|k| k.id != key_id);
        Ok(())
    }

    async fn list_cluster_ssh_keys(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<Vec<SshKey>> {
        let world = self.world();
        let assigned = world.cluster_keys.get(cluster_id).cloned().unwrap_or_default();
        Ok(world
            .ssh_keys
            .get(project_id)
            .map(|keys| {
                keys.iter()
                    .filter(|k| assigned.contains(&k.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn assign_ssh_key_to_cluster(
        &self,
        _project_id: &str,
        cluster_id: &str,
        key_id: &str,
    ) -> ApiResult<()> {
        self.world()
            .cluster_keys
            .entry(cluster_id.to_string())
            .or_default()
            .insert(key_id.to_string());
        Ok(())
    }

    async fn detach_ssh_key_from_cluster(
        &self,
        _project_id: &str,
        cluster_id: &str,
        key_id: &str,
    ) -> ApiResult<()> {
        if let Some(keys) = self.world().cluster_keys.get_mut(cluster_id) {
            keys.remove(key_id);
        }
        Ok(())
    }

    async fn list_node_deployments(
        &self,
        _project_id: &str,
        cluster_id: &str,
    ) -> ApiResult<Vec<NodeDeployment>> {
        Ok(self
            .world()
            .node_deployments
            .iter()
            .filter(|((c, _), _)| c == cluster_id)
            .map(|(_, nd)| nd.clone())
            .collect())
    }

    async fn get_node_deployment(
        &self,
        _project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
    ) -> ApiResult<NodeDeployment> {
        self.world()
            .node_deployments
            .get(&(cluster_id.to_string(), node_deployment_id.to_string()))
            .cloned()
            .ok_or_else(|| not_found("getNodeDeployment"))
    }

    async fn create_node_deployment(
        &self,
        project_id: &str,
        cluster_id: &str,
        node_deployment: &NodeDeployment,
    ) -> ApiResult<NodeDeployment> {
        self.get_cluster(project_id, cluster_id).await?;
        let mut world = self.world();
        let id = world.id("nd-");
        let replicas = node_deployment.spec.replicas;
        let nd = NodeDeployment {
            id: id.clone(),
            creation_timestamp: Some(Utc::now()),
            status: Some(NodeDeploymentStatus {
                observed_generation: 1,
                replicas,
                updated_replicas: replicas,
                ready_replicas: replicas,
                available_replicas: replicas,
                unavailable_replicas: 0,
            }),
            ..node_deployment.clone()
        };
        world
            .node_deployments
            .insert((cluster_id.to_string(), id), nd.clone());
        Ok(nd)
    }

    async fn patch_node_deployment(
        &self,
        _project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
        patch: &NodeDeploymentPatch,
    ) -> ApiResult<NodeDeployment> {
        let mut world = self.world();
        let nd = world
            .node_deployments
            .get_mut(&(cluster_id.to_string(), node_deployment_id.to_string()))
            .ok_or_else(|| not_found("patchNodeDeployment"))?;
        merge(&mut nd.spec, &patch.spec);
        let replicas = nd.spec.replicas;
        let status = nd.status.get_or_insert_with(Default::default);
        status.observed_generation += 1;
        status.replicas = replicas;
        status.updated_replicas = replicas;
        status.ready_replicas = replicas;
        status.available_replicas = replicas;
        status.unavailable_replicas = 0;
        Ok(nd.clone())
    }

    async fn delete_node_deployment(
        &self,
        _project_id: &str,
        cluster_id: &str,
        node_deployment_id: &str,
    ) -> ApiResult<()> {
        self.world()
            .node_deployments
            .remove(&(cluster_id.to_string(), node_deployment_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found("deleteNodeDeployment"))
    }

    async fn list_service_accounts(&self, project_id: &str) -> ApiResult<Vec<ServiceAccount>> {
        Ok(self
            .world()
            .service_accounts
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_service_account(
        &self,
        project_id: &str,
        service_account: &ServiceAccount,
    ) -> ApiResult<ServiceAccount> {
        let mut world = self.world();
        let id = world.id("sa-");
        let sa = ServiceAccount {
            id,
            name: service_account.name.clone(),
            group: format!("{}-{project_id}", service_account.group),
            status: "Active".to_string(),
            creation_timestamp: Some(Utc::now()),
        };
        world
            .service_accounts
            .entry(project_id.to_string())
            .or_default()
            .push(sa.clone());
        Ok(sa)
    }

    async fn update_service_account(
        &self,
        project_id: &str,
        service_account_id: &str,
        service_account: &ServiceAccount,
    ) -> ApiResult<ServiceAccount> {
        let mut world = self.world();
        let sa = world
            .service_accounts
            .get_mut(project_id)
            .and_then(|all| all.iter_mut().find(|sa| sa.id == service_account_id))
            .ok_or_else(|| not_found("updateServiceAccount"))?;
        sa.name = service_account.name.clone();
        sa.group = format!("{}-{project_id}", service_account.group);
        Ok(sa.clone())
    }

    async fn delete_service_account(
        &self,
        project_id: &str,
        service_account_id: &str,
    ) -> ApiResult<()> {
        let mut world = self.world();
        if let Some(all) = world.service_accounts.get_mut(project_id) {
            all.retain(|sa| sa.id != service_account_id);
        }
        world.tokens.remove(service_account_id);
        Ok(())
    }

    async fn list_service_account_tokens(
        &self,
        _project_id: &str,
        service_account_id: &str,
    ) -> ApiResult<Vec<ServiceAccountToken>> {
        Ok(self
            .world()
            .tokens
            .get(service_account_id)
            .map(|tokens| {
                tokens
                    .iter()
                    .map(|t| ServiceAccountToken {
                        token: String::new(),
                        ..t.clone()
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_service_account_token(
        &self,
        _project_id: &str,
        service_account_id: &str,
        request: &TokenNameRequest,
    ) -> ApiResult<ServiceAccountToken> {
        let mut world = self.world();
        let id = world.id("t-");
        let token = ServiceAccountToken {
            id: id.clone(),
            name: request.name.clone(),
            token: format!("secret-{id}"),
            expiry: Some(Utc::now() + chrono::Duration::days(365)),
            creation_timestamp: Some(Utc::now()),
        };
        world
            .tokens
            .entry(service_account_id.to_string())
            .or_default()
            .push(token.clone());
        Ok(token)
    }

    async fn patch_service_account_token(
        &self,
        _project_id: &str,
        service_account_id: &str,
        token_id: &str,
        request: &TokenNameRequest,
    ) -> ApiResult<ServiceAccountToken> {
        let mut world = self.world();
        let token = world
            .tokens
            .get_mut(service_account_id)
            .and_then(|all| all.iter_mut().find(|t| t.id == token_id))
            .ok_or_else(|| not_found("patchServiceAccountToken"))?;
        token.name = request.name.clone();
        Ok(ServiceAccountToken {
            token: String::new(),
            ..token.clone()
        })
    }

    async fn delete_service_account_token(
        &self,
        _project_id: &str,
        service_account_id: &str,
        token_id: &str,
    ) -> ApiResult<()> {
        if let Some(all) = self.world().tokens.get_mut(service_account_id) {
            all.retain(|t| t.id != token_id);
        }
        Ok(())
    }

    async fn list_datacenters(&self) -> ApiResult<Vec<Datacenter>> {
        Ok(self.world().datacenters.clone())
    }

    async fn get_datacenter(&self, name: &str) -> ApiResult<Datacenter> {
        self.world()
            .datacenters
            .iter()
            .find(|dc| dc.metadata.name == name)
            .cloned()
            .ok_or_else(|| not_found("getDatacenter"))
    }

    async fn list_openstack_networks(
        &self,
        _credentials: &OpenstackCredentials,
    ) -> ApiResult<Vec<OpenstackNetwork>> {
        Ok(self.world().networks.clone())
    }

    async fn list_openstack_subnets(
        &self,
        _credentials: &OpenstackCredentials,
        network_id: &str,
    ) -> ApiResult<Vec<OpenstackSubnet>> {
        Ok(vec![OpenstackSubnet {
            id: format!("{network_id}-subnet"),
            name: "default".to_string(),
        }])
    }

    async fn list_master_versions(&self) -> ApiResult<Vec<MasterVersion>> {
        Ok(self.world().versions.clone())
    }

    async fn list_node_upgrades(
        &self,
        control_plane_version: &str,
    ) -> ApiResult<Vec<MasterVersion>> {
        let limit = semver::Version::parse(control_plane_version).ok();
        Ok(self
            .world()
            .versions
            .iter()
            .filter(|v| match (&limit, semver::Version::parse(&v.version)) {
                (Some(limit), Ok(v)) => v <= *limit,
                _ => true,
            })
            .cloned()
            .collect())
    }
}
