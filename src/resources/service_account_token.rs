use async_trait::async_trait;
use tokio::time::Instant;
use tracing::info;

use super::{gone_as_none, ignore_gone, minutes, mutate, PlanAction, Resource, Timeouts};
use crate::id::{ServiceAccountId, TokenId};
use crate::provider::Context;
use crate::schema::{TokenConfig, TokenState};
use crate::structure::{expand_token, flatten_token};
use crate::validation::Diagnostic;
use crate::{Error, Result};

/// `metakube_service_account_token`
///
/// The token value is only returned on creation and is kept in state from
/// then on.
#[derive(Clone, Debug)]
pub struct ServiceAccountTokenResource {
    timeouts: Timeouts,
}

impl Default for ServiceAccountTokenResource {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::uniform(minutes(1)),
        }
    }
}

impl ServiceAccountTokenResource {
    pub fn with_timeouts(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    fn owner(config: &TokenConfig) -> Result<ServiceAccountId> {
        if config.name.trim().is_empty() {
            return Err(Diagnostic::new("name", "must not be empty").into());
        }
        ServiceAccountId::parse(&config.service_account_id)
            .map_err(|e| Diagnostic::new("service_account_id", e.to_string()).into())
    }

    async fn fetch(ctx: &Context, id: &TokenId, prior_token: Option<&str>) -> Result<Option<TokenState>> {
        let Some(tokens) = gone_as_none(
            "list service account tokens",
            ctx.api()
                .list_service_account_tokens(&id.project_id, &id.service_account_id)
                .await,
        )?
        else {
            return Ok(None);
        };
        let owner = id.service_account();
        Ok(tokens
            .iter()
            .find(|t| t.id == id.token_id)
            .map(|t| flatten_token(&owner, t, prior_token)))
    }
}

#[async_trait]
impl Resource for ServiceAccountTokenResource {
    type Config = TokenConfig;
    type State = TokenState;

    const TYPE_NAME: &'static str = "metakube_service_account_token";

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn plan(
        &self,
        _ctx: &Context,
        prior: Option<&TokenState>,
        config: &TokenConfig,
    ) -> Result<PlanAction> {
        Self::owner(config)?;
        Ok(match prior {
            None => PlanAction::Create,
            Some(prior) if prior.config.service_account_id != config.service_account_id => {
                PlanAction::Replace {
                    reasons: vec!["service_account_id".to_string()],
                }
            }
            Some(prior) if prior.config.name == config.name => PlanAction::NoOp,
            Some(_) => PlanAction::Update,
        })
    }

    async fn create(&self, ctx: &Context, config: &TokenConfig) -> Result<TokenState> {
        let owner = Self::owner(config)?;
        let deadline = Instant::now() + self.timeouts.create;

        let request = expand_token(config);
        let created = mutate(ctx, "create service account token", "addTokenToServiceAccount", deadline, || {
            ctx.api().create_service_account_token(
                &owner.project_id,
                &owner.service_account_id,
                &request,
            )
        })
        .await?;
        info!(service_account_id = %owner, token_id = %created.id, "Created service account token");

        Ok(flatten_token(&owner, &created, None))
    }

    async fn read(&self, ctx: &Context, state: &TokenState) -> Result<Option<TokenState>> {
        Self::fetch(ctx, &TokenId::parse(&state.id)?, Some(&state.token)).await
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: &TokenState,
        config: &TokenConfig,
    ) -> Result<TokenState> {
        let owner = Self::owner(config)?;
        let deadline = Instant::now() + self.timeouts.update;
        let id = TokenId::parse(&prior.id)?;

        let request = expand_token(config);
        let updated = mutate(ctx, "rename service account token", "patchServiceAccountToken", deadline, || {
            ctx.api().patch_service_account_token(
                &id.project_id,
                &id.service_account_id,
                &id.token_id,
                &request,
            )
        })
        .await?;
        info!(token_id = %id, name = %config.name, "Renamed service account token");

        Ok(flatten_token(&owner, &updated, Some(&prior.token)))
    }

    async fn delete(&self, ctx: &Context, state: &TokenState) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.delete;
        let id = TokenId::parse(&state.id)?;
        let result = mutate(ctx, "delete service account token", "deleteServiceAccountToken", deadline, || {
            ctx.api().delete_service_account_token(
                &id.project_id,
                &id.service_account_id,
                &id.token_id,
            )
        })
        .await;
        ignore_gone("delete service account token", result)?;
        info!(token_id = %id, "Deleted service account token");
        Ok(())
    }

    /// Accepts `project_id:service_account_id:token_id`; the token value
    /// cannot be recovered
    async fn import(&self, ctx: &Context, id: &str) -> Result<TokenState> {
        Self::fetch(ctx, &TokenId::parse(id)?, None)
            .await?
            .ok_or_else(|| Error::not_found("service account token", id))
    }
}
