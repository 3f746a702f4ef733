//! Request and response bodies of the MetaKube API

mod access;
mod cluster;
mod node_deployment;
mod project;
mod provider;

pub use access::*;
pub use cluster::*;
pub use node_deployment::*;
pub use project::*;
pub use provider::*;
