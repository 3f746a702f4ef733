//! Stories about SSH keys, service accounts and tokens

use metakube::datasources::{DataSource, K8sVersionConfig, K8sVersionDataSource};
use metakube::resources::{
    PlanAction, Resource, ServiceAccountResource, ServiceAccountTokenResource, SshKeyResource,
};
use metakube::schema::{ServiceAccountConfig, SshKeyConfig, TokenConfig};

use super::{project, setup};

/// A CI pipeline gets a service account and a token. The token value is
/// shown once and kept across refreshes and renames; deleting the account
/// takes its tokens along.
#[tokio::test]
async fn story_service_account_with_token() {
    let (_api, ctx) = setup();
    let project = project(&ctx, "ci", &[]).await;
    let accounts = ServiceAccountResource::default();
    let tokens = ServiceAccountTokenResource::default();

    let sa_config = ServiceAccountConfig {
        project_id: project.id.clone(),
        name: "pipeline".to_string(),
        group: "editors".to_string(),
    };
    let sa = accounts.create(&ctx, &sa_config).await.unwrap();
    assert!(sa.id.starts_with(&format!("{}:", project.id)));
    assert_eq!(sa.config, sa_config);

    let token_config = TokenConfig {
        service_account_id: sa.id.clone(),
        name: "deploy".to_string(),
    };
    let token = tokens.create(&ctx, &token_config).await.unwrap();
    assert!(token.token.starts_with("secret-"));
    assert!(!token.expiry.is_empty());

    let refreshed = tokens.read(&ctx, &token).await.unwrap().unwrap();
    assert_eq!(refreshed.token, token.token);

    let renamed_config = TokenConfig {
        name: "release".to_string(),
        ..token_config
    };
    assert_eq!(
        tokens.plan(&ctx, Some(&refreshed), &renamed_config).await.unwrap(),
        PlanAction::Update
    );
    let renamed = tokens.update(&ctx, &refreshed, &renamed_config).await.unwrap();
    assert_eq!(renamed.config.name, "release");
    assert_eq!(renamed.token, token.token);

    let viewers = ServiceAccountConfig {
        group: "viewers".to_string(),
        ..sa_config
    };
    let sa = accounts.update(&ctx, &sa, &viewers).await.unwrap();
    assert_eq!(sa.config.group, "viewers");

    accounts.delete(&ctx, &sa).await.unwrap();
    assert!(accounts.read(&ctx, &sa).await.unwrap().is_none());
    assert!(tokens.read(&ctx, &renamed).await.unwrap().is_none());
}

/// SSH keys import by `project_id:key_id` and disappear on delete.
#[tokio::test]
async fn story_ssh_key_import_and_delete() {
    let (_api, ctx) = setup();
    let project = project(&ctx, "keys", &[]).await;
    let keys = SshKeyResource::default();

    let created = keys
        .create(
            &ctx,
            &SshKeyConfig {
                project_id: project.id.clone(),
                name: "laptop".to_string(),
                public_key: "ssh-ed25519 AAAA me@laptop\n".to_string(),
            },
        )
        .await
        .unwrap();

    let imported = keys
        .import(&ctx, &format!("{}:{}", project.id, created.id))
        .await
        .unwrap();
    assert_eq!(imported.id, created.id);
    assert_eq!(imported.fingerprint, created.fingerprint);
    assert_eq!(imported.config.public_key, "ssh-ed25519 AAAA me@laptop");

    keys.delete(&ctx, &created).await.unwrap();
    assert!(keys.read(&ctx, &created).await.unwrap().is_none());
}

/// The newest offered 1.18 control plane is picked.
#[tokio::test]
async fn story_k8s_version_lookup() {
    let (_api, ctx) = setup();
    let state = K8sVersionDataSource
        .read(
            &ctx,
            &K8sVersionConfig {
                major: Some("1".to_string()),
                minor: Some("18".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(state.version, "1.18.8");
}
