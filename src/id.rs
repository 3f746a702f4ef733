//! Composite resource identifiers
//!
//! Terraform stores a single string ID per resource. Resources owned by a
//! project or cluster join the owner IDs with `:`; parsing is strict and never
//! returns a partial result.

use metakube_client::MetakubeApi;
use tracing::{debug, warn};

use crate::error::{classify, CallKind, ErrorClass};
use crate::{Error, Result};

/// Separator between ID segments
pub const SEPARATOR: char = ':';

/// Join the non-empty parts with `:`
pub fn make_id<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

/// Split `id` into exactly `N` non-empty segments
pub fn parse_id<const N: usize>(id: &str) -> Result<[String; N]> {
    let segments: Vec<&str> = id.split(SEPARATOR).collect();
    if segments.len() != N {
        return Err(Error::invalid_id(
            id,
            format!("expected {} segments separated by ':', got {}", N, segments.len()),
        ));
    }
    if let Some(pos) = segments.iter().position(|s| s.is_empty()) {
        return Err(Error::invalid_id(id, format!("segment {} is empty", pos + 1)));
    }

    let mut parts: [String; N] = std::array::from_fn(|_| String::new());
    for (slot, segment) in parts.iter_mut().zip(segments) {
        *slot = segment.to_string();
    }
    Ok(parts)
}

/// ID of a service account: `project_id:service_account_id`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceAccountId {
    pub project_id: String,
    pub service_account_id: String,
}

impl ServiceAccountId {
    /// Parse `project_id:service_account_id`
    pub fn parse(id: &str) -> Result<Self> {
        let [project_id, service_account_id] = parse_id::<2>(id)?;
        Ok(Self {
            project_id,
            service_account_id,
        })
    }
}

impl std::fmt::Display for ServiceAccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&make_id(&[&self.project_id, &self.service_account_id]))
    }
}

/// ID of a service account token: `project_id:service_account_id:token_id`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenId {
    pub project_id: String,
    pub service_account_id: String,
    pub token_id: String,
}

impl TokenId {
    /// Parse `project_id:service_account_id:token_id`
    pub fn parse(id: &str) -> Result<Self> {
        let [project_id, service_account_id, token_id] = parse_id::<3>(id)?;
        Ok(Self {
            project_id,
            service_account_id,
            token_id,
        })
    }

    /// The owning service account
    pub fn service_account(&self) -> ServiceAccountId {
        ServiceAccountId {
            project_id: self.project_id.clone(),
            service_account_id: self.service_account_id.clone(),
        }
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&make_id(&[
            &self.project_id,
            &self.service_account_id,
            &self.token_id,
        ]))
    }
}

/// Find the project a cluster belongs to
///
/// Scans every project visible to the caller and lists its clusters. There is
/// no caching; call volumes per Terraform run are tiny.
pub async fn find_cluster_project(client: &dyn MetakubeApi, cluster_id: &str) -> Result<String> {
    let projects = client
        .list_projects()
        .await
        .map_err(|e| Error::api("list projects", &e))?;

    for project in projects {
        let clusters = match client.list_clusters(&project.id).await {
            Ok(clusters) => clusters,
            Err(e) if classify(&e, CallKind::Read) == ErrorClass::Gone => {
                warn!(project_id = %project.id, "Skipping project without cluster access");
                continue;
            }
            Err(e) => return Err(Error::api(format!("list clusters of project {}", project.id), &e)),
        };
        if clusters.iter().any(|c| c.id == cluster_id) {
            debug!(project_id = %project.id, cluster_id, "Found owning project");
            return Ok(project.id);
        }
    }

    Err(Error::not_found("project owning cluster", cluster_id))
}
