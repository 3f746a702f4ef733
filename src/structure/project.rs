use std::collections::BTreeSet;

use metakube_client::models::{CreateProjectRequest, Project, ProjectGroup, User};

use super::format_timestamp;
use crate::schema::{ProjectConfig, ProjectState, ProjectUser};

pub fn expand_project(config: &ProjectConfig) -> CreateProjectRequest {
    CreateProjectRequest {
        name: config.name.clone(),
        labels: config.labels.clone(),
    }
}

/// Full replacement body for an existing project
pub fn expand_project_update(config: &ProjectConfig, existing: &Project) -> Project {
    Project {
        name: config.name.clone(),
        labels: config.labels.clone(),
        ..existing.clone()
    }
}

/// Membership request adding `user` to `project_id`
pub fn expand_project_user(project_id: &str, user: &ProjectUser) -> User {
    User {
        email: user.email.clone(),
        projects: vec![ProjectGroup {
            id: project_id.to_string(),
            group: user.role.clone(),
        }],
        ..Default::default()
    }
}

/// `owners-abc123` in project `abc123` is `owners`
pub fn strip_project_suffix<'a>(group: &'a str, project_id: &str) -> &'a str {
    group
        .strip_suffix(project_id)
        .and_then(|g| g.strip_suffix('-'))
        .filter(|g| !g.is_empty())
        .unwrap_or(group)
}

/// Members of a project as configuration
///
/// With `managed` set, only those emails are reported; members added outside
/// of the configuration (such as the project creator) are left alone.
pub fn flatten_project_users(
    project_id: &str,
    members: &[User],
    managed: Option<&BTreeSet<String>>,
) -> BTreeSet<ProjectUser> {
    members
        .iter()
        .filter(|u| managed.map_or(true, |m| m.contains(&u.email)))
        .filter_map(|u| {
            u.group_in(project_id).map(|group| ProjectUser {
                email: u.email.clone(),
                role: strip_project_suffix(group, project_id).to_string(),
            })
        })
        .collect()
}

pub fn flatten_project(project: &Project, users: BTreeSet<ProjectUser>) -> ProjectState {
    ProjectState {
        id: project.id.clone(),
        config: ProjectConfig {
            name: project.name.clone(),
            labels: project.labels.clone(),
            users,
        },
        status: project.status.to_string(),
        creation_timestamp: format_timestamp(project.creation_timestamp),
        deletion_timestamp: format_timestamp(project.deletion_timestamp),
    }
}
