use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found")]
    NotFound,

    /// A project record exists without its dependency list.
    #[error("data integrity fault: {0}")]
    Integrity(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("rate limited")]
    RateLimited,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("job {job_id} failed in task group {task_group}")]
    JobFailed { job_id: String, task_group: String },

    #[error("job {job_id} did not complete within {timeout:?}")]
    JobTimedOut { job_id: String, timeout: Duration },

    #[error("dependency extraction failed: {0}")]
    Extract(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl Error {
    /// Upstream asked us to back off; the caller should try again on its next tick.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
