use async_trait::async_trait;
use tracing::info;

use super::Submitter;
use crate::error::Result;
use crate::types::{Project, UpdateTarget};

/// Records the intent and succeeds. Used for dry runs.
#[derive(Debug, Default, Clone)]
pub struct LogOnlySubmitter;

impl LogOnlySubmitter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Submitter for LogOnlySubmitter {
    async fn submit_pr(&self, project: &Project, target: &UpdateTarget) -> Result<()> {
        info!(
            project = %project.name,
            dependency = %target.dependency,
            to_version = %target.to_version,
            to_revision = %target.to_revision,
            "submit PR for {}, update {} to {}",
            project.name,
            target.dependency,
            target.to_version
        );
        Ok(())
    }
}
