//! Configuration and state shapes of every resource
//!
//! These mirror the Terraform schema: snake_case attribute names, and optional
//! nested blocks stored as lists of at most one element. In Rust an optional
//! block is an `Option<T>`; the [`block`] and [`one_block`] serde adapters do
//! the list conversion.

mod access;
mod cluster;
mod node_deployment;
mod project;

pub use access::*;
pub use cluster::*;
pub use node_deployment::*;
pub use project::*;

use std::fmt;

/// Serde adapter for an optional nested block (`[]` or `[value]`)
pub mod block {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let items: Vec<&T> = value.iter().collect();
        items.serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let mut items: Vec<T> = Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default();
        if items.len() > 1 {
            return Err(D::Error::invalid_length(items.len(), &"at most one block"));
        }
        Ok(items.pop())
    }
}

/// Serde adapter for a required nested block (`[value]`)
pub mod one_block {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        [value].serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let mut items: Vec<T> = Vec::deserialize(deserializer)?;
        if items.len() != 1 {
            return Err(D::Error::invalid_length(items.len(), &"exactly one block"));
        }
        items
            .pop()
            .ok_or_else(|| D::Error::invalid_length(0, &"exactly one block"))
    }
}

/// Cloud provider families, as named in configuration and datacenter specs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Aws,
    Openstack,
    Azure,
    BringYourOwn,
}

impl ProviderKind {
    /// Every provider, in attribute order
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Aws,
        ProviderKind::Openstack,
        ProviderKind::Azure,
        ProviderKind::BringYourOwn,
    ];

    /// Attribute name of the provider block
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Openstack => "openstack",
            Self::Azure => "azure",
            Self::BringYourOwn => "bringyourown",
        }
    }

    /// Parse the provider name used by datacenter specs
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "aws" => Some(Self::Aws),
            "openstack" => Some(Self::Openstack),
            "azure" => Some(Self::Azure),
            "bringyourown" => Some(Self::BringYourOwn),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
