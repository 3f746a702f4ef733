//! Plan-time cross-field validation
//!
//! Checks run before apply and may read live API state, but never write.
//! Every failure is a [`Diagnostic`] carrying the attribute path it refers to
//! and, where it helps, the values that would have been accepted.

pub mod cluster;
pub mod node_deployment;
pub mod openstack;

use std::fmt;

use semver::Version;

/// A single validation failure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Attribute path, e.g. `spec.0.version`
    pub path: String,
    /// What is wrong
    pub summary: String,
    /// Values that would pass the check
    pub alternatives: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic for an attribute path
    pub fn new(path: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            summary: summary.into(),
            alternatives: Vec::new(),
        }
    }

    /// Attach the list of valid alternatives
    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.summary)?;
        if !self.alternatives.is_empty() {
            write!(f, " (available: {})", self.alternatives.join(", "))?;
        }
        Ok(())
    }
}

/// A collection of validation failures
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    /// Record a failure
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Record the failure of a check, if any
    pub fn check(&mut self, result: Result<(), Diagnostic>) {
        if let Err(d) = result {
            self.push(d);
        }
    }

    /// Merge the failures of another check
    pub fn extend(&mut self, result: Result<(), Diagnostics>) {
        if let Err(other) = result {
            self.0.extend(other.0);
        }
    }

    /// True when nothing failed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the failures
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// `Ok` when nothing failed
    pub fn into_result(self) -> Result<(), Diagnostics> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(d: Diagnostic) -> Self {
        Self(vec![d])
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl From<Diagnostics> for crate::Error {
    fn from(d: Diagnostics) -> Self {
        crate::Error::Validation(d)
    }
}

impl From<Diagnostic> for crate::Error {
    fn from(d: Diagnostic) -> Self {
        crate::Error::Validation(d.into())
    }
}

/// Parse a Kubernetes version, tolerating a leading `v`
pub fn parse_version(version: &str) -> Option<Version> {
    Version::parse(version.trim().trim_start_matches('v')).ok()
}

/// Parse a version or report it at `path`
pub fn require_version(path: &str, version: &str) -> Result<Version, Diagnostic> {
    parse_version(version).ok_or_else(|| {
        Diagnostic::new(path, format!("'{version}' is not a valid semantic version"))
    })
}
