use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A managed repository that receives dependency updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Import-path-like identifier, e.g. `github.com/acme/widgets`. Case-insensitive.
    pub name: String,
    pub git_url: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// The package path, not necessarily the project root.
    pub name: String,
    /// A revision or tag.
    pub revision: String,
    /// Alternative source, or fork, for the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// What a single submission should move a dependency to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub dependency: String,
    pub to_version: String,
    pub to_revision: String,
}

impl fmt::Display for UpdateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.dependency, self.to_version, self.to_revision)
    }
}

/// Upstream API quota as reported with each response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u32,
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}
