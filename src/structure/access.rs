use metakube_client::models::{
    ServiceAccount, ServiceAccountToken, SshKey, SshKeySpec, TokenNameRequest,
};

use super::{format_timestamp, strip_project_suffix};
use crate::id::{ServiceAccountId, TokenId};
use crate::schema::{
    ServiceAccountConfig, ServiceAccountState, SshKeyConfig, SshKeyState, TokenConfig, TokenState,
};

pub fn expand_ssh_key(config: &SshKeyConfig) -> SshKey {
    SshKey {
        name: config.name.clone(),
        spec: SshKeySpec {
            public_key: config.public_key.trim().to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// SSH key state; the configured key text is kept when it only differs in
/// surrounding whitespace
pub fn flatten_ssh_key(project_id: &str, prior: Option<&SshKeyConfig>, key: &SshKey) -> SshKeyState {
    let public_key = match prior {
        Some(p) if p.same_key(&key.spec.public_key) => p.public_key.clone(),
        _ => key.spec.public_key.clone(),
    };
    SshKeyState {
        id: key.id.clone(),
        config: SshKeyConfig {
            project_id: project_id.to_string(),
            name: key.name.clone(),
            public_key,
        },
        fingerprint: key.spec.fingerprint.clone(),
    }
}

pub fn expand_service_account(config: &ServiceAccountConfig) -> ServiceAccount {
    ServiceAccount {
        name: config.name.clone(),
        group: config.group.clone(),
        ..Default::default()
    }
}

pub fn flatten_service_account(project_id: &str, sa: &ServiceAccount) -> ServiceAccountState {
    let id = ServiceAccountId {
        project_id: project_id.to_string(),
        service_account_id: sa.id.clone(),
    };
    ServiceAccountState {
        id: id.to_string(),
        config: ServiceAccountConfig {
            project_id: project_id.to_string(),
            name: sa.name.clone(),
            group: strip_project_suffix(&sa.group, project_id).to_string(),
        },
        creation_timestamp: format_timestamp(sa.creation_timestamp),
    }
}

pub fn expand_token(config: &TokenConfig) -> TokenNameRequest {
    TokenNameRequest {
        name: config.name.clone(),
    }
}

/// Token state; the secret is only sent on creation, so an empty value keeps
/// `prior_token`
pub fn flatten_token(
    owner: &ServiceAccountId,
    token: &ServiceAccountToken,
    prior_token: Option<&str>,
) -> TokenState {
    let id = TokenId {
        project_id: owner.project_id.clone(),
        service_account_id: owner.service_account_id.clone(),
        token_id: token.id.clone(),
    };
    TokenState {
        id: id.to_string(),
        config: TokenConfig {
            service_account_id: owner.to_string(),
            name: token.name.clone(),
        },
        token: super::preserve(&token.token, prior_token),
        expiry: format_timestamp(token.expiry),
        creation_timestamp: format_timestamp(token.creation_timestamp),
    }
}
