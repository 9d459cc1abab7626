//! # depfresh
//!
//! Keeps projects' dependencies fresh. When an upstream repository publishes
//! a stable release, every registered project whose dependency list includes
//! that package (or a package beneath it) gets an update request.
//!
//! Releases arrive by polling the public event feed ([`watch::Watcher`]) or
//! through webhook deliveries ([`webhook::create_router`]); both feed the
//! same [`release::ReleaseProcessor`].
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use depfresh::release::ReleaseProcessor;
//! use depfresh::store::{Index, SqliteIndex};
//! use depfresh::submit::LogOnlySubmitter;
//!
//! let index = SqliteIndex::new("./data/depfresh.db")?;
//! index.initialize()?;
//! let processor = ReleaseProcessor::new(Arc::new(index), Arc::new(LogOnlySubmitter::new()));
//! processor.process(&event).await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod github;
pub mod release;
pub mod store;
pub mod submit;
pub mod types;
pub mod watch;
pub mod webhook;

#[cfg(test)]
mod test_utils;
