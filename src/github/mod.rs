//! The upstream public event feed.

mod client;

pub use client::GitHubClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Event, RateLimit};

/// One page of the feed together with the quota reported alongside it.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub rate: Option<RateLimit>,
}

/// A source of public events.
///
/// Implementations report an exhausted quota as `Error::RateLimited` so callers
/// can treat it as a soft failure.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn list_events(&self, page: u32, per_page: u32) -> Result<EventPage>;

    async fn rate_limits(&self) -> Result<RateLimit>;
}
