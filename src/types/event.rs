use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const RELEASE_EVENT_TYPE: &str = "ReleaseEvent";

/// An entry from the public events feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub repo: Option<EventRepo>,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRepo {
    #[serde(default)]
    pub id: Option<u64>,
    /// `owner/name`
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Full repository name, `owner/name`.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub prerelease: Option<bool>,
    #[serde(default)]
    pub target_commitish: Option<String>,
}

/// A release notification, normalized from either the events feed or a webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseEvent {
    pub repo: Option<Repository>,
    pub release: Option<Release>,
}

impl ReleaseEvent {
    pub fn repo_name(&self) -> Option<&str> {
        self.repo.as_ref()?.name.as_deref()
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.release.as_ref()?.tag_name.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.release
            .as_ref()
            .and_then(|r| r.prerelease)
            .unwrap_or(false)
    }

    pub fn target_commitish(&self) -> &str {
        self.release
            .as_ref()
            .and_then(|r| r.target_commitish.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct FeedReleasePayload {
    #[serde(default)]
    release: Option<Release>,
}

#[derive(Debug, Deserialize)]
struct WebhookRepository {
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookReleasePayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    release: Option<Release>,
    #[serde(default)]
    repository: Option<WebhookRepository>,
}

impl Event {
    /// Decodes the payload of a `ReleaseEvent`. Other event types yield `None`.
    ///
    /// The feed carries the repository on the envelope rather than the payload,
    /// so it is promoted onto the release event here.
    pub fn release_event(&self) -> Result<Option<ReleaseEvent>> {
        if self.kind != RELEASE_EVENT_TYPE {
            return Ok(None);
        }
        let payload: FeedReleasePayload = serde_json::from_value(self.payload.clone())?;
        Ok(Some(ReleaseEvent {
            repo: self.repo.as_ref().map(|r| Repository {
                name: r.name.clone(),
            }),
            release: payload.release,
        }))
    }
}

impl ReleaseEvent {
    /// Decodes a `release` webhook delivery body.
    ///
    /// Only the `published` action announces a new release; other actions
    /// (edited, deleted, ...) yield `None`.
    pub fn from_webhook(body: &[u8]) -> Result<Option<ReleaseEvent>> {
        let payload: WebhookReleasePayload = serde_json::from_slice(body)?;
        if payload.action.as_deref() != Some("published") {
            return Ok(None);
        }
        Ok(Some(ReleaseEvent {
            repo: payload.repository.map(|r| Repository { name: r.full_name }),
            release: payload.release,
        }))
    }
}
