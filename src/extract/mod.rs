//! Dependency extraction from a project's repository.
//!
//! The configured branch is cloned bare into a temporary directory and each
//! manifest reader is tried in turn against the tip commit's tree. The first
//! reader whose manifest is present wins.

mod gomod;
mod govendor;

use std::path::Path;

use async_trait::async_trait;
use git2::build::RepoBuilder;
use git2::{ErrorCode, Repository, Tree};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Dependency, Project};

/// Lists the dependencies of the current revision of a project.
#[async_trait]
pub trait DependencyExtractor: Send + Sync {
    async fn dependencies(&self, project: &Project) -> Result<Vec<Dependency>>;
}

/// Read access to the files of one revision.
pub trait SourceTree {
    /// Contents of the file at `path`, or `None` if there is no such file.
    fn read(&self, path: &str) -> Result<Option<String>>;
}

type ManifestReader = fn(&dyn SourceTree) -> Result<Option<Vec<Dependency>>>;

const READERS: &[(&str, ManifestReader)] = &[
    ("govendor", govendor::read as ManifestReader),
    ("gomod", gomod::read as ManifestReader),
];

/// Runs the manifest readers in order; the first that finds its manifest decides.
pub fn read_dependencies(tree: &dyn SourceTree) -> Result<(&'static str, Vec<Dependency>)> {
    for (system, reader) in READERS {
        match reader(tree)? {
            Some(deps) => return Ok((*system, deps)),
            None => debug!(system, "dependency system not used"),
        }
    }
    Err(Error::Extract("no dependency management found".to_string()))
}

struct CommitTree<'r> {
    repo: &'r Repository,
    tree: Tree<'r>,
}

impl SourceTree for CommitTree<'_> {
    fn read(&self, path: &str) -> Result<Option<String>> {
        let entry = match self.tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = entry.to_object(self.repo)?;
        let Some(blob) = object.as_blob() else {
            return Ok(None);
        };
        let content = std::str::from_utf8(blob.content())
            .map_err(|_| Error::Extract(format!("{path} is not valid UTF-8")))?;
        Ok(Some(content.to_string()))
    }
}

/// Clones the project's branch with git2 and reads its manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitExtractor;

impl GitExtractor {
    pub fn new() -> Self {
        Self
    }

    fn clone_branch(project: &Project, dest: &Path) -> Result<Repository> {
        let refspec = format!(
            "+refs/heads/{0}:refs/remotes/origin/{0}",
            project.branch
        );
        let mut builder = RepoBuilder::new();
        builder
            .bare(true)
            .branch(&project.branch)
            .remote_create(|repo, name, url| repo.remote_with_fetch(name, url, &refspec));
        builder.clone(&project.git_url, dest).map_err(|e| {
            Error::Extract(format!(
                "unable to clone {} ({}): {}",
                project.git_url,
                project.branch,
                e.message()
            ))
        })
    }

    fn extract_blocking(project: &Project) -> Result<Vec<Dependency>> {
        let dir = tempfile::Builder::new().prefix("depfresh").tempdir()?;
        let repo = Self::clone_branch(project, dir.path())?;
        let tree = repo.head()?.peel_to_tree()?;

        let (system, deps) = read_dependencies(&CommitTree { repo: &repo, tree })?;
        info!(
            project = %project.name,
            system,
            count = deps.len(),
            "extracted dependencies"
        );
        Ok(deps)
    }
}

#[async_trait]
impl DependencyExtractor for GitExtractor {
    async fn dependencies(&self, project: &Project) -> Result<Vec<Dependency>> {
        let project = project.clone();
        tokio::task::spawn_blocking(move || Self::extract_blocking(&project))
            .await
            .map_err(|e| Error::Extract(format!("extraction task failed: {e}")))?
    }
}

#[cfg(test)]
impl SourceTree for std::collections::HashMap<&str, &str> {
    fn read(&self, path: &str) -> Result<Option<String>> {
        Ok(self.get(path).map(|s| s.to_string()))
    }
}
