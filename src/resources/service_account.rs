use async_trait::async_trait;
use metakube_client::models::ServiceAccount;
use tokio::time::Instant;
use tracing::info;

use super::{gone_as_none, ignore_gone, minutes, mutate, PlanAction, Resource, Timeouts};
use crate::id::ServiceAccountId;
use crate::provider::Context;
use crate::schema::{ServiceAccountConfig, ServiceAccountState, SERVICE_ACCOUNT_GROUPS};
use crate::structure::{expand_service_account, flatten_service_account};
use crate::validation::{Diagnostic, Diagnostics};
use crate::{Error, Result};

/// `metakube_service_account`
#[derive(Clone, Debug)]
pub struct ServiceAccountResource {
    timeouts: Timeouts,
}

impl Default for ServiceAccountResource {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::uniform(minutes(1)),
        }
    }
}

impl ServiceAccountResource {
    pub fn with_timeouts(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    fn validate(config: &ServiceAccountConfig) -> Result<()> {
        let mut diags = Diagnostics::default();
        if config.name.trim().is_empty() {
            diags.push(Diagnostic::new("name", "must not be empty"));
        }
        if !SERVICE_ACCOUNT_GROUPS.contains(&config.group.as_str()) {
            diags.push(
                Diagnostic::new("group", format!("invalid group {}", config.group))
                    .with_alternatives(SERVICE_ACCOUNT_GROUPS),
            );
        }
        Ok(diags.into_result()?)
    }

    async fn fetch(ctx: &Context, id: &ServiceAccountId) -> Result<Option<ServiceAccountState>> {
        let Some(accounts) = gone_as_none(
            "list service accounts",
            ctx.api().list_service_accounts(&id.project_id).await,
        )?
        else {
            return Ok(None);
        };
        Ok(accounts
            .iter()
            .find(|sa| sa.id == id.service_account_id)
            .map(|sa| flatten_service_account(&id.project_id, sa)))
    }
}

#[async_trait]
impl Resource for ServiceAccountResource {
    type Config = ServiceAccountConfig;
    type State = ServiceAccountState;

    const TYPE_NAME: &'static str = "metakube_service_account";

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn plan(
        &self,
        _ctx: &Context,
        prior: Option<&ServiceAccountState>,
        config: &ServiceAccountConfig,
    ) -> Result<PlanAction> {
        Self::validate(config)?;
        Ok(match prior {
            None => PlanAction::Create,
            Some(prior) if prior.config.project_id != config.project_id => PlanAction::Replace {
                reasons: vec!["project_id".to_string()],
            },
            Some(prior) if prior.config == *config => PlanAction::NoOp,
            Some(_) => PlanAction::Update,
        })
    }

    async fn create(&self, ctx: &Context, config: &ServiceAccountConfig) -> Result<ServiceAccountState> {
        Self::validate(config)?;
        let deadline = Instant::now() + self.timeouts.create;
        let project_id = config.project_id.as_str();

        let body = expand_service_account(config);
        let created = mutate(ctx, "create service account", "createServiceAccount", deadline, || {
            ctx.api().create_service_account(project_id, &body)
        })
        .await?;
        info!(project_id, service_account_id = %created.id, group = %config.group, "Created service account");

        Ok(flatten_service_account(project_id, &created))
    }

    async fn read(&self, ctx: &Context, state: &ServiceAccountState) -> Result<Option<ServiceAccountState>> {
        Self::fetch(ctx, &ServiceAccountId::parse(&state.id)?).await
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: &ServiceAccountState,
        config: &ServiceAccountConfig,
    ) -> Result<ServiceAccountState> {
        Self::validate(config)?;
        let deadline = Instant::now() + self.timeouts.update;
        let id = ServiceAccountId::parse(&prior.id)?;

        let body = ServiceAccount {
            id: id.service_account_id.clone(),
            ..expand_service_account(config)
        };
        let updated = mutate(ctx, "update service account", "updateServiceAccount", deadline, || {
            ctx.api()
                .update_service_account(&id.project_id, &id.service_account_id, &body)
        })
        .await?;
        info!(service_account_id = %id, "Updated service account");

        Ok(flatten_service_account(&id.project_id, &updated))
    }

    async fn delete(&self, ctx: &Context, state: &ServiceAccountState) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.delete;
        let id = ServiceAccountId::parse(&state.id)?;
        let result = mutate(ctx, "delete service account", "deleteServiceAccount", deadline, || {
            ctx.api()
                .delete_service_account(&id.project_id, &id.service_account_id)
        })
        .await;
        ignore_gone("delete service account", result)?;
        info!(service_account_id = %id, "Deleted service account");
        Ok(())
    }

    /// Accepts `project_id:service_account_id`
    async fn import(&self, ctx: &Context, id: &str) -> Result<ServiceAccountState> {
        Self::fetch(ctx, &ServiceAccountId::parse(id)?)
            .await?
            .ok_or_else(|| Error::not_found("service account", id))
    }
}
