mod key;
mod schema;
mod sqlite;

pub use key::{dependency_key_matches, project_key};
pub use sqlite::SqliteIndex;

use crate::error::Result;
use crate::types::{Dependency, Project};

/// Project records plus the dependency -> project reverse index.
///
/// Reads see a consistent snapshot and registrations are all-or-nothing.
pub trait Index: Send + Sync {
    fn initialize(&self) -> Result<()>;

    /// Replaces the project's record, dependency list and reverse-index
    /// entries in a single transaction.
    fn register_project(&self, project: &Project, dependencies: &[Dependency]) -> Result<()>;

    /// Fails with `Error::NotFound` for an unknown project and with
    /// `Error::Integrity` when the record has no dependency list.
    fn project(&self, name: &str) -> Result<(Project, Vec<Dependency>)>;

    /// Keys of the projects depending on `dependency` or a package beneath it.
    fn projects_for_dependency(&self, dependency: &str) -> Result<Vec<String>>;
}
