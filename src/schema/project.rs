use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Groups a project member can belong to
pub const PROJECT_ROLES: [&str; 3] = ["owners", "editors", "viewers"];

/// `metakube_project` configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub users: BTreeSet<ProjectUser>,
}

/// Membership of one user, keyed by email
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectUser {
    pub email: String,
    pub role: String,
}

/// `metakube_project` state
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProjectState {
    pub id: String,
    #[serde(flatten)]
    pub config: ProjectConfig,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub creation_timestamp: String,
    #[serde(default)]
    pub deletion_timestamp: String,
}
