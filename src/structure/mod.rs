//! Conversion between resource configuration and API bodies
//!
//! `expand_*` builds request bodies from configuration, `flatten_*` turns API
//! responses back into configuration-shaped state. Both are total: they never
//! fail on well-typed input. Values the API never echoes (credentials, token
//! secrets) are carried over from the last known configuration.

mod access;
mod cluster;
mod node_deployment;
mod project;

pub use access::*;
pub use cluster::*;
pub use node_deployment::*;
pub use project::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 rendering of an optional timestamp, empty when absent
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// The API value, or the previously known one when the API left it empty
pub(crate) fn preserve(api: &str, prior: Option<&str>) -> String {
    if api.is_empty() {
        prior.unwrap_or_default().to_string()
    } else {
        api.to_string()
    }
}
