//! Submission drivers: turn "update dependency X to version Y for project P"
//! into an actual change request.

mod dispatch;
mod log_only;
mod nomad;

pub use dispatch::{JobDispatchSubmitter, JobScheduler, JobState, JobSummary, TaskGroupSummary};
pub use log_only::LogOnlySubmitter;
pub use nomad::NomadClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Project, UpdateTarget};

/// Starts an update for one project and waits for it to finish.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit_pr(&self, project: &Project, target: &UpdateTarget) -> Result<()>;
}
