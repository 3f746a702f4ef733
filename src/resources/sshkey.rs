use async_trait::async_trait;
use tokio::time::Instant;
use tracing::info;

use super::{gone_as_none, ignore_gone, minutes, mutate, PlanAction, Resource, Timeouts};
use crate::id::parse_id;
use crate::provider::Context;
use crate::schema::{SshKeyConfig, SshKeyState};
use crate::structure::{expand_ssh_key, flatten_ssh_key};
use crate::validation::{Diagnostic, Diagnostics};
use crate::{Error, Result};

/// `metakube_sshkey`
///
/// Keys cannot be changed in place; any change replaces the key.
#[derive(Clone, Debug)]
pub struct SshKeyResource {
    timeouts: Timeouts,
}

impl Default for SshKeyResource {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::uniform(minutes(1)),
        }
    }
}

impl SshKeyResource {
    pub fn with_timeouts(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    fn validate(config: &SshKeyConfig) -> Result<()> {
        let mut diags = Diagnostics::default();
        for (path, value) in [
            ("project_id", &config.project_id),
            ("name", &config.name),
            ("public_key", &config.public_key),
        ] {
            if value.trim().is_empty() {
                diags.push(Diagnostic::new(path, "must not be empty"));
            }
        }
        Ok(diags.into_result()?)
    }

    async fn fetch(
        ctx: &Context,
        project_id: &str,
        key_id: &str,
        prior: Option<&SshKeyConfig>,
    ) -> Result<Option<SshKeyState>> {
        // There is no single-key endpoint.
        let Some(keys) = gone_as_none("list ssh keys", ctx.api().list_ssh_keys(project_id).await)?
        else {
            return Ok(None);
        };
        Ok(keys
            .iter()
            .find(|k| k.id == key_id)
            .map(|k| flatten_ssh_key(project_id, prior, k)))
    }
}

#[async_trait]
impl Resource for SshKeyResource {
    type Config = SshKeyConfig;
    type State = SshKeyState;

    const TYPE_NAME: &'static str = "metakube_sshkey";

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn plan(
        &self,
        _ctx: &Context,
        prior: Option<&SshKeyState>,
        config: &SshKeyConfig,
    ) -> Result<PlanAction> {
        Self::validate(config)?;
        let Some(prior) = prior else {
            return Ok(PlanAction::Create);
        };

        let mut reasons = Vec::new();
        if prior.config.project_id != config.project_id {
            reasons.push("project_id".to_string());
        }
        if prior.config.name != config.name {
            reasons.push("name".to_string());
        }
        if !prior.config.same_key(&config.public_key) {
            reasons.push("public_key".to_string());
        }
        Ok(if reasons.is_empty() {
            PlanAction::NoOp
        } else {
            PlanAction::Replace { reasons }
        })
    }

    async fn create(&self, ctx: &Context, config: &SshKeyConfig) -> Result<SshKeyState> {
        Self::validate(config)?;
        let deadline = Instant::now() + self.timeouts.create;
        let project_id = config.project_id.as_str();

        let body = expand_ssh_key(config);
        let created = mutate(ctx, "create ssh key", "createSSHKey", deadline, || {
            ctx.api().create_ssh_key(project_id, &body)
        })
        .await?;
        info!(project_id, key_id = %created.id, fingerprint = %created.spec.fingerprint, "Created SSH key");

        Ok(flatten_ssh_key(project_id, Some(config), &created))
    }

    async fn read(&self, ctx: &Context, state: &SshKeyState) -> Result<Option<SshKeyState>> {
        Self::fetch(ctx, &state.config.project_id, &state.id, Some(&state.config)).await
    }

    /// Keys are immutable, so an update recreates the key
    async fn update(
        &self,
        ctx: &Context,
        prior: &SshKeyState,
        config: &SshKeyConfig,
    ) -> Result<SshKeyState> {
        self.delete(ctx, prior).await?;
        self.create(ctx, config).await
    }

    async fn delete(&self, ctx: &Context, state: &SshKeyState) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.delete;
        let project_id = state.config.project_id.as_str();
        let result = mutate(ctx, "delete ssh key", "deleteSSHKey", deadline, || {
            ctx.api().delete_ssh_key(project_id, &state.id)
        })
        .await;
        ignore_gone("delete ssh key", result)?;
        info!(project_id, key_id = %state.id, "Deleted SSH key");
        Ok(())
    }

    /// Accepts `project_id:key_id`
    async fn import(&self, ctx: &Context, id: &str) -> Result<SshKeyState> {
        let [project_id, key_id] = parse_id::<2>(id)?;
        Self::fetch(ctx, &project_id, &key_id, None)
            .await?
            .ok_or_else(|| Error::not_found("ssh key", id))
    }
}
