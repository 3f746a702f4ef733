use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use metakube_client::models::ProjectStatus;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{
    gone_as_none, ignore_gone, minutes, mutate, remaining, wait_project_active, PlanAction,
    Resource, Timeouts,
};
use crate::poll::{deleted_or_fail, poll_until, Poll};
use crate::provider::Context;
use crate::schema::{ProjectConfig, ProjectState, ProjectUser, PROJECT_ROLES};
use crate::structure::{
    expand_project, expand_project_update, expand_project_user, flatten_project,
    flatten_project_users,
};
use crate::validation::{Diagnostic, Diagnostics};
use crate::{Error, Result};

/// `metakube_project`
#[derive(Clone, Debug)]
pub struct ProjectResource {
    timeouts: Timeouts,
}

impl Default for ProjectResource {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::uniform(minutes(5)),
        }
    }
}

impl ProjectResource {
    pub fn with_timeouts(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    fn validate(config: &ProjectConfig) -> Result<()> {
        let mut diags = Diagnostics::default();
        if config.name.trim().is_empty() {
            diags.push(Diagnostic::new("name", "must not be empty"));
        }
        let mut seen = BTreeSet::new();
        for user in &config.users {
            if !PROJECT_ROLES.contains(&user.role.as_str()) {
                diags.push(
                    Diagnostic::new("users", format!("invalid role {} for {}", user.role, user.email))
                        .with_alternatives(PROJECT_ROLES),
                );
            }
            if !seen.insert(user.email.as_str()) {
                diags.push(Diagnostic::new(
                    "users",
                    format!("{} is listed more than once", user.email),
                ));
            }
        }
        Ok(diags.into_result()?)
    }

    /// Bring the members listed in `desired` in line, removing those that
    /// were managed before but are no longer listed
    async fn sync_users(
        ctx: &Context,
        project_id: &str,
        previous: &BTreeSet<ProjectUser>,
        desired: &BTreeSet<ProjectUser>,
        deadline: Instant,
    ) -> Result<()> {
        if previous.is_empty() && desired.is_empty() {
            return Ok(());
        }

        let members = ctx
            .api()
            .list_project_users(project_id)
            .await
            .map_err(|e| Error::api("list project users", &e))?;
        let current: BTreeMap<&str, &_> = members.iter().map(|u| (u.email.as_str(), u)).collect();
        let current_roles = flatten_project_users(project_id, &members, None);

        for user in desired {
            if current_roles.contains(user) {
                continue;
            }
            let body = expand_project_user(project_id, user);
            match current.get(user.email.as_str()) {
                Some(member) => {
                    debug!(project_id, email = %user.email, role = %user.role, "Changing project member role");
                    let body = metakube_client::models::User {
                        id: member.id.clone(),
                        ..body
                    };
                    mutate(ctx, "edit project user", "editUserInProject", deadline, || {
                        ctx.api().edit_user_in_project(project_id, &member.id, &body)
                    })
                    .await?;
                }
                None => {
                    debug!(project_id, email = %user.email, role = %user.role, "Adding project member");
                    mutate(ctx, "add project user", "addUserToProject", deadline, || {
                        ctx.api().add_user_to_project(project_id, &body)
                    })
                    .await?;
                }
            }
        }

        let keep: BTreeSet<&str> = desired.iter().map(|u| u.email.as_str()).collect();
        for user in previous.iter().filter(|u| !keep.contains(u.email.as_str())) {
            let Some(member) = current.get(user.email.as_str()) else {
                continue;
            };
            debug!(project_id, email = %user.email, "Removing project member");
            let result = mutate(ctx, "remove project user", "deleteUserFromProject", deadline, || {
                ctx.api().delete_user_from_project(project_id, &member.id)
            })
            .await;
            ignore_gone("remove project user", result)?;
        }
        Ok(())
    }

    async fn fetch(
        ctx: &Context,
        project_id: &str,
        managed: Option<&BTreeSet<String>>,
    ) -> Result<Option<ProjectState>> {
        let Some(project) = gone_as_none("read project", ctx.api().get_project(project_id).await)?
        else {
            return Ok(None);
        };
        if project.status == ProjectStatus::Terminating || project.deletion_timestamp.is_some() {
            debug!(project_id, "Project is being deleted");
            return Ok(None);
        }

        let members = match managed {
            Some(m) if m.is_empty() => Vec::new(),
            _ => ctx
                .api()
                .list_project_users(project_id)
                .await
                .map_err(|e| Error::api("list project users", &e))?,
        };
        let users = flatten_project_users(project_id, &members, managed);
        Ok(Some(flatten_project(&project, users)))
    }
}

fn emails(users: &BTreeSet<ProjectUser>) -> BTreeSet<String> {
    users.iter().map(|u| u.email.clone()).collect()
}

#[async_trait]
impl Resource for ProjectResource {
    type Config = ProjectConfig;
    type State = ProjectState;

    const TYPE_NAME: &'static str = "metakube_project";

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn plan(
        &self,
        _ctx: &Context,
        prior: Option<&ProjectState>,
        config: &ProjectConfig,
    ) -> Result<PlanAction> {
        Self::validate(config)?;
        Ok(match prior {
            None => PlanAction::Create,
            Some(prior) if prior.config == *config => PlanAction::NoOp,
            Some(_) => PlanAction::Update,
        })
    }

    async fn create(&self, ctx: &Context, config: &ProjectConfig) -> Result<ProjectState> {
        Self::validate(config)?;
        let deadline = Instant::now() + self.timeouts.create;

        let request = expand_project(config);
        let created = mutate(ctx, "create project", "createProject", deadline, || {
            ctx.api().create_project(&request)
        })
        .await?;
        info!(project_id = %created.id, name = %created.name, "Created project");

        wait_project_active(ctx, &created.id, remaining(deadline)).await?;
        Self::sync_users(ctx, &created.id, &BTreeSet::new(), &config.users, deadline).await?;

        Self::fetch(ctx, &created.id, Some(&emails(&config.users)))
            .await?
            .ok_or_else(|| Error::not_found("project", &created.id))
    }

    async fn read(&self, ctx: &Context, state: &ProjectState) -> Result<Option<ProjectState>> {
        Self::fetch(ctx, &state.id, Some(&emails(&state.config.users))).await
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: &ProjectState,
        config: &ProjectConfig,
    ) -> Result<ProjectState> {
        Self::validate(config)?;
        let deadline = Instant::now() + self.timeouts.update;
        let project_id = prior.id.as_str();

        if prior.config.name != config.name || prior.config.labels != config.labels {
            let existing = ctx
                .api()
                .get_project(project_id)
                .await
                .map_err(|e| Error::api("read project", &e))?;
            let body = expand_project_update(config, &existing);
            mutate(ctx, "update project", "updateProject", deadline, || {
                ctx.api().update_project(project_id, &body)
            })
            .await?;
            info!(project_id, name = %config.name, "Updated project");
        }

        wait_project_active(ctx, project_id, remaining(deadline)).await?;
        Self::sync_users(ctx, project_id, &prior.config.users, &config.users, deadline).await?;

        Self::fetch(ctx, project_id, Some(&emails(&config.users)))
            .await?
            .ok_or_else(|| Error::not_found("project", project_id))
    }

    async fn delete(&self, ctx: &Context, state: &ProjectState) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.delete;
        let project_id = state.id.as_str();

        let result = mutate(ctx, "delete project", "deleteProject", deadline, || {
            ctx.api().delete_project(project_id)
        })
        .await;
        ignore_gone("delete project", result)?;

        poll_until(
            &format!("project {project_id} to be deleted"),
            remaining(deadline),
            &ctx.cancel,
            || async {
                match ctx.api().get_project(project_id).await {
                    Ok(p) => Ok(Poll::Pending(format!("status {}", p.status))),
                    Err(e) => deleted_or_fail("get project", e),
                }
            },
        )
        .await?;
        info!(project_id, "Deleted project");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<ProjectState> {
        Self::fetch(ctx, id, None)
            .await?
            .ok_or_else(|| Error::not_found("project", id))
    }
}
