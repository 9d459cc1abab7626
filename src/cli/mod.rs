mod commands;
mod pr;
mod project;
mod serve;

pub use commands::{DataArgs, PrCommands, ProjectCommands, SubmitterArgs};
pub use pr::run_pr_submit;
pub use project::{run_project_dependents, run_project_register, run_project_show};
pub use serve::{run_listen, run_watch};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Settings, SubmitterKind};
use crate::store::{Index, SqliteIndex};
use crate::submit::{JobDispatchSubmitter, LogOnlySubmitter, NomadClient, Submitter};

/// Loads settings from `--config`, or from the data directory.
pub fn load_settings(data: &DataArgs) -> anyhow::Result<Settings> {
    let settings = match &data.config {
        Some(path) => {
            let mut settings = Settings::load(path)?;
            settings.data_dir.clone_from(&data.data_dir);
            settings
        }
        None => Settings::load_from_data_dir(&data.data_dir)?,
    };
    Ok(settings)
}

/// Opens the index in the data directory, creating it if needed.
pub fn init_index(settings: &Settings) -> anyhow::Result<SqliteIndex> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let index = SqliteIndex::new(settings.db_path())?;
    index.initialize()?;
    Ok(index)
}

pub fn build_submitter(settings: &Settings) -> anyhow::Result<Arc<dyn Submitter>> {
    let submitter: Arc<dyn Submitter> = match settings.submitter {
        SubmitterKind::LogOnly => Arc::new(LogOnlySubmitter::new()),
        SubmitterKind::Nomad => {
            let nomad = &settings.nomad;
            info!(address = %nomad.address, region = %nomad.region, job = %nomad.job_id, "submitting through nomad");
            let client = NomadClient::new(&nomad.address, &nomad.region)?;
            Arc::new(JobDispatchSubmitter::new(
                Arc::new(client),
                nomad.job_id.clone(),
                nomad.poll_interval(),
                nomad.timeout(),
            ))
        }
    };
    Ok(submitter)
}

/// A token cancelled on the first interrupt.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                trigger.cancel();
            }
            Err(e) => warn!("unable to listen for interrupt: {e}"),
        }
    });
    token
}
