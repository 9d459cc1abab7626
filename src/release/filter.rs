//! Decides whether a release event announces an actionable stable version.

use std::fmt;

use semver::Version;

use crate::types::ReleaseEvent;

/// Why a release event was not acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingRepository,
    FlaggedPrerelease,
    InvalidVersion(String),
    PrereleaseVersion(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingRepository => {
                write!(f, "release event does not have necessary information")
            }
            Rejection::FlaggedPrerelease => write!(f, "release event is flagged pre-release"),
            Rejection::InvalidVersion(tag) => {
                write!(f, "release event tag is not valid semver: {tag:?}")
            }
            Rejection::PrereleaseVersion(tag) => {
                write!(f, "release event tag has pre-release information: {tag:?}")
            }
        }
    }
}

/// A release that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedRelease<'a> {
    pub repo_name: &'a str,
    pub version: Version,
}

pub fn qualify(event: &ReleaseEvent) -> Result<QualifiedRelease<'_>, Rejection> {
    let repo_name = event.repo_name().ok_or(Rejection::MissingRepository)?;

    if event.is_prerelease() {
        return Err(Rejection::FlaggedPrerelease);
    }

    let tag = event.tag_name().unwrap_or_default();
    let version = parse_tag(tag).ok_or_else(|| Rejection::InvalidVersion(tag.to_string()))?;

    // Catches tags like `v1.2.3-pre` that were not flagged as pre-releases.
    if !version.pre.is_empty() {
        return Err(Rejection::PrereleaseVersion(tag.to_string()));
    }

    Ok(QualifiedRelease { repo_name, version })
}

pub fn should_process(event: &ReleaseEvent) -> bool {
    qualify(event).is_ok()
}

/// Parses a tag as semver after dropping a leading `v`. A core of one or two
/// numeric parts (`v1`, `1.2`) is padded with `.0` up to three.
fn parse_tag(tag: &str) -> Option<Version> {
    let tag = tag.strip_prefix('v').unwrap_or(tag);
    let (core, rest) = tag.split_at(tag.find(['-', '+']).unwrap_or(tag.len()));
    let parts = core.split('.').count();
    let numeric = core
        .split('.')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
    if parts < 3 && numeric {
        let padded = format!("{core}{}{rest}", ".0".repeat(3 - parts));
        return Version::parse(&padded).ok();
    }
    Version::parse(tag).ok()
}
