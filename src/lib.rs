//! MetaKube provider core
//!
//! Maps declarative configuration of MetaKube projects, clusters, node
//! deployments, SSH keys, service accounts and service account tokens onto the
//! MetaKube REST API, and waits for the platform to converge.
//!
//! # Modules
//!
//! - [`provider`] - Provider configuration and the per-operation [`provider::Context`]
//! - [`resources`] - Plan/create/read/update/delete/import for each resource kind
//! - [`datasources`] - Read-only lookups (Kubernetes versions)
//! - [`schema`] - Configuration and state shapes
//! - [`structure`] - Conversion between configuration and API bodies
//! - [`validation`] - Plan-time cross-field checks against live API state
//! - [`poll`] - Deadline-bounded readiness polling
//! - [`retry`] - Conflict retries with backoff
//! - [`id`] - Composite resource identifiers
//! - [`config`] - Provider settings resolution
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types and API error normalization

pub mod config;
pub mod datasources;
pub mod error;
pub mod id;
pub mod poll;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod structure;
pub mod telemetry;
pub mod validation;

pub use error::Error;
pub use provider::{Context, Provider};

/// Result type alias using our custom Error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
