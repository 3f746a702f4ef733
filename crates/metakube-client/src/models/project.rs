//! Project and project membership models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported for a project
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ProjectStatus {
    /// Project exists but RBAC is not provisioned yet
    #[default]
    Inactive,
    /// Project is usable
    Active,
    /// Project is being deleted
    Terminating,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "Inactive"),
            Self::Active => write!(f, "Active"),
            Self::Terminating => write!(f, "Terminating"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A project as returned by the API
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project ID
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Display name
    pub name: String,

    /// Project labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Lifecycle status
    #[serde(default)]
    pub status: ProjectStatus,

    /// When the project was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    /// When deletion of the project started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,

    /// Users owning the project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<User>,
}

/// Body for `POST /api/v1/projects`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Display name
    pub name: String,

    /// Project labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// A user and the projects it belongs to
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Display name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Email address, used as the membership key
    pub email: String,

    /// Project memberships
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectGroup>,

    /// When the user was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Membership of a user in a project
///
/// The API answers with groups of the form `<role>-<project id>` but accepts
/// the bare role on writes.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProjectGroup {
    /// Project ID
    pub id: String,

    /// Group name
    pub group: String,
}

impl User {
    /// Group this user holds in the given project, if any
    pub fn group_in(&self, project_id: &str) -> Option<&str> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.group.as_str())
    }
}
