use std::sync::Arc;

use tracing::{debug, info, warn};

use super::filter::qualify;
use crate::error::{Error, Result};
use crate::store::Index;
use crate::submit::Submitter;
use crate::types::{ReleaseEvent, UpdateTarget};

/// Host prefix of package names for repositories on the upstream forge.
pub const DEPENDENCY_HOST: &str = "github.com";

/// Package name for a repository, e.g. `foo/bar` -> `github.com/foo/bar`.
pub fn dependency_name(repo_full_name: &str) -> String {
    format!("{DEPENDENCY_HOST}/{repo_full_name}")
}

/// Fans a qualifying release out to every project that depends on it.
pub struct ReleaseProcessor {
    index: Arc<dyn Index>,
    submitter: Arc<dyn Submitter>,
}

impl ReleaseProcessor {
    pub fn new(index: Arc<dyn Index>, submitter: Arc<dyn Submitter>) -> Self {
        Self { index, submitter }
    }

    /// Submits an update for each dependent project, in index order.
    ///
    /// Stops at the first submission failure; projects after it are not attempted.
    pub async fn process(&self, event: &ReleaseEvent) -> Result<()> {
        let release = match qualify(event) {
            Ok(release) => release,
            Err(reason) => {
                debug!(
                    repo = event.repo_name().unwrap_or("<unknown>"),
                    "skipping release: {reason}"
                );
                return Ok(());
            }
        };

        let target = UpdateTarget {
            dependency: dependency_name(release.repo_name),
            to_version: release.version.to_string(),
            to_revision: event.target_commitish().to_string(),
        };

        info!("release for {}, {:?}", release.repo_name, target.to_version);

        let keys = self.index.projects_for_dependency(&target.dependency)?;

        for key in keys {
            let project = match self.index.project(&key) {
                Ok((project, _)) => project,
                Err(Error::NotFound) => {
                    warn!(project = %key, "reverse index references a missing project, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            info!(
                "submitting PR for {}, bump {} to {}",
                key, release.repo_name, target.to_version
            );
            self.submitter.submit_pr(&project, &target).await?;
        }

        Ok(())
    }
}
