//! Lifecycle stories
//!
//! - `project_lifecycle`: creating, renaming and deleting a project, and
//!   managing its members
//! - `cluster_lifecycle`: cluster creation inside a project, drift-free
//!   reads, and plans that force replacement
//! - `node_deployment_lifecycle`: node deployments checked and scaled against
//!   their cluster
//! - `access_lifecycle`: SSH keys, service accounts and their tokens
//!
//! Every story builds its own [`fake_api::FakeApi`]; nothing is shared
//! between tests.

mod access_lifecycle;
mod cluster_lifecycle;
mod fake_api;
mod node_deployment_lifecycle;
mod project_lifecycle;

use std::collections::BTreeMap;
use std::sync::Arc;

use metakube::resources::{ProjectResource, Resource};
use metakube::schema::{ProjectConfig, ProjectState};
use metakube::Context;

use fake_api::FakeApi;

/// A fake API plus a context talking to it
fn setup() -> (Arc<FakeApi>, Context) {
    let api = Arc::new(FakeApi::new());
    let ctx = Context::new(api.clone());
    (api, ctx)
}

/// Create a project with the given labels
async fn project(ctx: &Context, name: &str, labels: &[(&str, &str)]) -> ProjectState {
    let config = ProjectConfig {
        name: name.to_string(),
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        ..Default::default()
    };
    ProjectResource::default()
        .create(ctx, &config)
        .await
        .expect("project creation should succeed")
}
