use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "depfresh.toml";
pub const DB_FILE_NAME: &str = "depfresh.db";

/// Everything a depfresh process needs, loaded from `depfresh.toml` with
/// secrets taken from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub submitter: SubmitterKind,
    pub github: GitHubSettings,
    pub watch: WatchSettings,
    pub webhook: WebhookSettings,
    pub nomad: NomadSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// API call budget; the poll cadence is one hour divided by this.
    pub calls_per_hour: u32,
    pub per_page: u32,
    pub tick_backlog: usize,
    pub status_interval_secs: u64,
    pub observed_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NomadSettings {
    pub address: String,
    pub region: String,
    pub job_id: String,
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitterKind {
    #[default]
    LogOnly,
    Nomad,
}

impl FromStr for SubmitterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "logonly" => Ok(SubmitterKind::LogOnly),
            "nomad" => Ok(SubmitterKind::Nomad),
            other => Err(Error::Config(format!("unexpected submitter type {other:?}"))),
        }
    }
}

impl fmt::Display for SubmitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitterKind::LogOnly => f.write_str("logonly"),
            SubmitterKind::Nomad => f.write_str("nomad"),
        }
    }
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            calls_per_hour: 4950,
            per_page: 100,
            tick_backlog: 100,
            status_interval_secs: 300,
            observed_capacity: 10_000,
        }
    }
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            secret: None,
        }
    }
}

impl Default for NomadSettings {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:4646".to_string(),
            region: "global".to_string(),
            job_id: "go-fresh-pr-govendor".to_string(),
            poll_interval_ms: 1000,
            timeout_secs: 30 * 60,
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str::<Settings>(&raw)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
        } else {
            Settings::default()
        };
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Loads `depfresh.toml` from the data directory.
    pub fn load_from_data_dir(data_dir: &Path) -> Result<Self> {
        let mut settings = Self::load(&data_dir.join(CONFIG_FILE_NAME))?;
        settings.data_dir = data_dir.to_path_buf();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Some(token) = non_empty_env("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(secret) = non_empty_env("DEPFRESH_WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.calls_per_hour == 0 {
            return Err(Error::Config("watch.calls_per_hour must be positive".into()));
        }
        if !(1..=100).contains(&self.watch.per_page) {
            return Err(Error::Config("watch.per_page must be between 1 and 100".into()));
        }
        if self.watch.tick_backlog == 0 || self.watch.observed_capacity == 0 {
            return Err(Error::Config(
                "watch.tick_backlog and watch.observed_capacity must be positive".into(),
            ));
        }
        if self.nomad.poll_interval_ms == 0 {
            return Err(Error::Config("nomad.poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl WatchSettings {
    /// One hour spread evenly over the call budget.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(3600) / self.calls_per_hour.max(1)
    }

    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

impl WebhookSettings {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl NomadSettings {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
