//! Job-dispatch submission.
//!
//! A parameterized job is dispatched to the cluster scheduler and its task
//! group summary is polled until the job reaches a terminal state:
//!
//! - any group reporting `failed` or `lost` allocations fails the submission
//!   immediately
//! - the job completes once something has completed and nothing is queued,
//!   starting or running
//! - otherwise polling continues until the timeout elapses

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Submitter;
use crate::error::{Error, Result};
use crate::types::{Project, UpdateTarget};

/// Allocation counts for one task group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskGroupSummary {
    pub queued: u64,
    pub starting: u64,
    pub running: u64,
    pub complete: u64,
    pub failed: u64,
    pub lost: u64,
}

/// Task group name -> counts.
pub type JobSummary = BTreeMap<String, TaskGroupSummary>;

/// The cluster scheduler as seen by the dispatch driver.
///
/// Implementations must be safe to share across concurrent submissions.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Dispatches an instance of a parameterized job, returning the dispatched job's id.
    async fn dispatch(&self, job_id: &str, meta: &HashMap<String, String>) -> Result<String>;

    async fn job_summary(&self, job_id: &str) -> Result<JobSummary>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    InProgress,
    Complete,
    Failed { task_group: String },
    TimedOut,
}

impl JobState {
    /// Classifies one poll of the job summary. Never yields `TimedOut`; that
    /// is decided by the poll loop.
    pub fn evaluate(summary: &JobSummary) -> JobState {
        if let Some((group, _)) = summary.iter().find(|(_, s)| s.failed > 0 || s.lost > 0) {
            return JobState::Failed {
                task_group: group.clone(),
            };
        }

        let total = summary
            .values()
            .fold(TaskGroupSummary::default(), |acc, s| TaskGroupSummary {
                queued: acc.queued + s.queued,
                starting: acc.starting + s.starting,
                running: acc.running + s.running,
                complete: acc.complete + s.complete,
                failed: acc.failed + s.failed,
                lost: acc.lost + s.lost,
            });

        let in_flight = total.queued + total.starting + total.running;
        if total.complete == 0 {
            if total.starting + total.running > 0 {
                JobState::InProgress
            } else {
                JobState::Pending
            }
        } else if in_flight == 0 {
            JobState::Complete
        } else {
            JobState::InProgress
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Complete | JobState::Failed { .. } | JobState::TimedOut
        )
    }
}

fn transition(job: &str, state: &mut JobState, next: JobState) {
    if next != *state {
        debug!(job, from = ?state, to = ?next, "job state changed");
        *state = next;
    }
}

/// Parameters handed to the update job.
pub fn dispatch_meta(project: &Project, target: &UpdateTarget) -> HashMap<String, String> {
    HashMap::from([
        ("PROJECT".to_string(), project.name.clone()),
        ("GIT_REMOTE".to_string(), project.git_url.clone()),
        ("GIT_BRANCH".to_string(), project.branch.clone()),
        ("DEPENDENCY".to_string(), target.dependency.clone()),
        ("TOVERSION".to_string(), target.to_version.clone()),
        ("TOREVISION".to_string(), target.to_revision.clone()),
    ])
}

pub struct JobDispatchSubmitter {
    scheduler: Arc<dyn JobScheduler>,
    job_id: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl JobDispatchSubmitter {
    pub fn new(
        scheduler: Arc<dyn JobScheduler>,
        job_id: impl Into<String>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            scheduler,
            job_id: job_id.into(),
            poll_interval,
            timeout,
        }
    }

    /// Polls the dispatched job until it reaches a terminal state. A job still
    /// running when the timeout elapses ends in `TimedOut`.
    pub async fn wait_for_completion(&self, dispatched_id: &str) -> Result<()> {
        let mut state = JobState::Pending;
        let poll = async {
            loop {
                let summary = self.scheduler.job_summary(dispatched_id).await?;
                transition(dispatched_id, &mut state, JobState::evaluate(&summary));
                if state.is_terminal() {
                    return Ok::<(), Error>(());
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let outcome = tokio::time::timeout(self.timeout, poll).await;
        match outcome {
            Ok(polled) => polled?,
            Err(_) => transition(dispatched_id, &mut state, JobState::TimedOut),
        }

        match state {
            JobState::Complete => Ok(()),
            JobState::Failed { task_group } => Err(Error::JobFailed {
                job_id: dispatched_id.to_string(),
                task_group,
            }),
            _ => {
                warn!(job = dispatched_id, timeout = ?self.timeout, "job timed out");
                Err(Error::JobTimedOut {
                    job_id: dispatched_id.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl Submitter for JobDispatchSubmitter {
    async fn submit_pr(&self, project: &Project, target: &UpdateTarget) -> Result<()> {
        let meta = dispatch_meta(project, target);
        let dispatched = self.scheduler.dispatch(&self.job_id, &meta).await?;

        info!(
            project = %project.name,
            job = %dispatched,
            "dispatched update job for {}",
            target
        );

        self.wait_for_completion(&dispatched).await?;

        info!(project = %project.name, job = %dispatched, "update job complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn group(counts: TaskGroupSummary) -> JobSummary {
        BTreeMap::from([("update".to_string(), counts)])
    }

    /// Replays scripted summaries, repeating the last one forever.
    struct ScriptedScheduler {
        summaries: Mutex<VecDeque<JobSummary>>,
        polls: Mutex<usize>,
        dispatched: Mutex<Vec<(String, HashMap<String, String>)>>,
    }

    impl ScriptedScheduler {
        fn new(summaries: Vec<JobSummary>) -> Self {
            Self {
                summaries: Mutex::new(summaries.into()),
                polls: Mutex::new(0),
                dispatched: Mutex::new(Vec::new()),
            }
        }

        fn polls(&self) -> usize {
            *self.polls.lock().unwrap()
        }
    }

    #[async_trait]
    impl JobScheduler for ScriptedScheduler {
        async fn dispatch(&self, job_id: &str, meta: &HashMap<String, String>) -> Result<String> {
            self.dispatched
                .lock()
                .unwrap()
                .push((job_id.to_string(), meta.clone()));
            Ok(format!("{job_id}/dispatch-1"))
        }

        async fn job_summary(&self, _job_id: &str) -> Result<JobSummary> {
            *self.polls.lock().unwrap() += 1;
            let mut summaries = self.summaries.lock().unwrap();
            if summaries.len() > 1 {
                Ok(summaries.pop_front().unwrap())
            } else {
                Ok(summaries.front().cloned().unwrap_or_default())
            }
        }
    }

    fn submitter(scheduler: Arc<ScriptedScheduler>) -> JobDispatchSubmitter {
        JobDispatchSubmitter::new(
            scheduler,
            "go-fresh-pr-govendor",
            Duration::from_millis(500),
            Duration::from_secs(10),
        )
    }

    fn project() -> Project {
        Project {
            name: "acme/widgets".to_string(),
            git_url: "https://example.com/acme/widgets.git".to_string(),
            branch: "main".to_string(),
        }
    }

    fn target() -> UpdateTarget {
        UpdateTarget {
            dependency: "github.com/foo/bar".to_string(),
            to_version: "2.0.0".to_string(),
            to_revision: "abc".to_string(),
        }
    }

    #[test]
    fn test_evaluate_states() {
        assert_eq!(JobState::evaluate(&JobSummary::new()), JobState::Pending);
        assert_eq!(
            JobState::evaluate(&group(TaskGroupSummary { queued: 1, ..Default::default() })),
            JobState::Pending
        );
        assert_eq!(
            JobState::evaluate(&group(TaskGroupSummary { running: 1, ..Default::default() })),
            JobState::InProgress
        );
        assert_eq!(
            JobState::evaluate(&group(TaskGroupSummary {
                complete: 1,
                running: 1,
                ..Default::default()
            })),
            JobState::InProgress
        );
        assert_eq!(
            JobState::evaluate(&group(TaskGroupSummary { complete: 1, ..Default::default() })),
            JobState::Complete
        );
        assert_eq!(
            JobState::evaluate(&group(TaskGroupSummary {
                complete: 3,
                lost: 1,
                ..Default::default()
            })),
            JobState::Failed {
                task_group: "update".to_string()
            }
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::InProgress.is_terminal());
        assert!(JobState::Complete.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
        assert!(
            JobState::Failed {
                task_group: "update".to_string()
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_transition_replaces_changed_state() {
        let mut state = JobState::Pending;
        transition("job", &mut state, JobState::Pending);
        assert_eq!(state, JobState::Pending);
        transition("job", &mut state, JobState::TimedOut);
        assert_eq!(state, JobState::TimedOut);
    }

    #[test]
    fn test_evaluate_names_failing_group() {
        let summary = BTreeMap::from([
            ("a".to_string(), TaskGroupSummary { complete: 1, ..Default::default() }),
            ("b".to_string(), TaskGroupSummary { failed: 2, ..Default::default() }),
        ]);
        assert_eq!(
            JobState::evaluate(&summary),
            JobState::Failed {
                task_group: "b".to_string()
            }
        );
    }

    #[test]
    fn test_dispatch_meta() {
        let meta = dispatch_meta(&project(), &target());
        assert_eq!(meta["PROJECT"], "acme/widgets");
        assert_eq!(meta["GIT_REMOTE"], "https://example.com/acme/widgets.git");
        assert_eq!(meta["GIT_BRANCH"], "main");
        assert_eq!(meta["DEPENDENCY"], "github.com/foo/bar");
        assert_eq!(meta["TOVERSION"], "2.0.0");
        assert_eq!(meta["TOREVISION"], "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_progress() {
        let scheduler = Arc::new(ScriptedScheduler::new(vec![
            group(TaskGroupSummary { queued: 1, ..Default::default() }),
            group(TaskGroupSummary { running: 1, ..Default::default() }),
            group(TaskGroupSummary { complete: 1, ..Default::default() }),
        ]));

        submitter(scheduler.clone())
            .submit_pr(&project(), &target())
            .await
            .unwrap();

        assert_eq!(scheduler.polls(), 3);
        let dispatched = scheduler.dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].0, "go-fresh-pr-govendor");
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_completing_job_times_out() {
        let scheduler = Arc::new(ScriptedScheduler::new(vec![group(TaskGroupSummary {
            complete: 0,
            ..Default::default()
        })]));

        let err = submitter(scheduler.clone())
            .submit_pr(&project(), &target())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::JobTimedOut { .. }));
        assert!(scheduler.polls() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_job_times_out() {
        let scheduler = Arc::new(ScriptedScheduler::new(vec![group(TaskGroupSummary {
            complete: 1,
            running: 1,
            ..Default::default()
        })]));

        let err = submitter(scheduler.clone())
            .wait_for_completion("go-fresh-pr-govendor/dispatch-1")
            .await
            .unwrap_err();

        match err {
            Error::JobTimedOut { job_id, timeout } => {
                assert_eq!(job_id, "go-fresh-pr-govendor/dispatch-1");
                assert_eq!(timeout, Duration::from_secs(10));
            }
            other => panic!("expected JobTimedOut, got {other:?}"),
        }
        // One poll per 500ms interval within the 10s timeout.
        assert!((20..=21).contains(&scheduler.polls()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stops_polling() {
        let scheduler = Arc::new(ScriptedScheduler::new(vec![
            group(TaskGroupSummary { failed: 1, ..Default::default() }),
            group(TaskGroupSummary { complete: 1, ..Default::default() }),
        ]));

        let err = submitter(scheduler.clone())
            .submit_pr(&project(), &target())
            .await
            .unwrap_err();

        match err {
            Error::JobFailed { job_id, task_group } => {
                assert_eq!(job_id, "go-fresh-pr-govendor/dispatch-1");
                assert_eq!(task_group, "update");
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }
        assert_eq!(scheduler.polls(), 1);
    }
}
