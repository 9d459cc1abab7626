//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::release::ReleaseProcessor;
use crate::store::{Index, SqliteIndex};
use crate::submit::Submitter;
use crate::types::{Dependency, Project, Release, ReleaseEvent, Repository, UpdateTarget};

/// Records every submission; optionally fails for one project.
#[derive(Default)]
pub struct RecordingSubmitter {
    calls: Mutex<Vec<(Project, UpdateTarget)>>,
    fail_for: Option<String>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(project: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_for: Some(project.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<(Project, UpdateTarget)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit_pr(&self, project: &Project, target: &UpdateTarget) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((project.clone(), target.clone()));
        if self.fail_for.as_deref() == Some(project.name.as_str()) {
            return Err(Error::Api {
                status: 500,
                message: format!("submission failed for {}", project.name),
            });
        }
        Ok(())
    }
}

pub fn project(name: &str) -> Project {
    Project {
        name: name.to_string(),
        git_url: format!("https://example.com/{name}.git"),
        branch: "main".to_string(),
    }
}

pub fn release_event(repo: &str, tag: &str, commitish: &str) -> ReleaseEvent {
    ReleaseEvent {
        repo: Some(Repository {
            name: Some(repo.to_string()),
        }),
        release: Some(Release {
            tag_name: Some(tag.to_string()),
            prerelease: Some(false),
            target_commitish: Some(commitish.to_string()),
        }),
    }
}

/// An in-memory index with `acme/widgets` depending on `github.com/foo/bar`.
pub fn seeded_index() -> Arc<SqliteIndex> {
    let index = SqliteIndex::open_in_memory().unwrap();
    index.initialize().unwrap();
    index
        .register_project(
            &project("acme/widgets"),
            &[Dependency::new("github.com/foo/bar", "abc")],
        )
        .unwrap();
    Arc::new(index)
}

pub fn processor(
    index: Arc<SqliteIndex>,
    submitter: Arc<RecordingSubmitter>,
) -> Arc<ReleaseProcessor> {
    Arc::new(ReleaseProcessor::new(index, submitter))
}
